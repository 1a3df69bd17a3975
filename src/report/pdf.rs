//! Fixed 5-page weekly nutrition report, rendered to bytes. The layout is
//! deliberately static: cover, executive summary, daily detail,
//! micronutrients, protein balance. All-or-nothing: any failure propagates
//! and no partial document leaves this module.

use std::io::BufWriter;

use lazy_static::lazy_static;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::utils::{calculate_points_for_circle, calculate_points_for_rect};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Polygon, Rgb,
};
use regex::Regex;
use time::Date;

use super::aggregate::{self, coverage_pct, Nutrient, Semaphore, WeeklyReferences};
use crate::planner::repo::{DayOfWeek, EntryWithDish};
use crate::profile::repo::NutritionistProfile;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const CONTENT_W: f32 = PAGE_W - MARGIN * 2.0;

const PRIMARY: (u8, u8, u8) = (6, 182, 212);
const DARK: (u8, u8, u8) = (15, 23, 42);
const GRAY: (u8, u8, u8) = (100, 116, 139);
const LIGHT: (u8, u8, u8) = (241, 245, 249);
const WHITE: (u8, u8, u8) = (255, 255, 255);

const BRAND: &str = "bocadi";

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new("[^a-z0-9]").expect("valid regex");
}

pub struct ReportOptions<'a> {
    pub entries: &'a [EntryWithDish],
    pub week_start: Date,
    pub week_end: Date,
    pub workspace_name: &'a str,
    pub requested_by: &'a str,
    pub nutritionist: Option<&'a NutritionistProfile>,
    pub refs: WeeklyReferences,
    pub generated_on: Date,
}

/// Deterministic output filename: brand, sanitized workspace name, ISO week
/// range. Anything that is not ascii-alphanumeric after lowercasing becomes
/// a hyphen.
pub fn report_filename(workspace_name: &str, week_start: Date, week_end: Date) -> String {
    let safe = NON_ALNUM
        .replace_all(&workspace_name.to_lowercase(), "-")
        .into_owned();
    format!("{BRAND}-reporte-{safe}-{week_start}_{week_end}.pdf")
}

fn fmt_date(d: Date) -> String {
    format!("{:02}/{:02}/{}", d.day(), u8::from(d.month()), d.year())
}

fn fmt_int(v: f64) -> String {
    format!("{}", v.round() as i64)
}

fn fmt_g(v: f64) -> String {
    format!("{v:.1}g")
}

fn mm(v: f32) -> Mm {
    Mm(v.into())
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        (f32::from(r) / 255.0).into(),
        (f32::from(g) / 255.0).into(),
        (f32::from(b) / 255.0).into(),
        None,
    ))
}

/// Protein-type colors come in as `#RRGGBB` strings from the catalog. The
/// catalog does not validate them, so anything unparsable falls back to gray
/// instead of failing the render.
fn parse_hex_color(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return GRAY;
    }
    let parse = |range| u8::from_str_radix(&hex[range], 16).unwrap_or(0x9c);
    (parse(0..2), parse(2..4), parse(4..6))
}

/// One page's drawing surface plus the two document fonts. Y coordinates in
/// this module are measured from the top edge, jsPDF-style; the flip to the
/// PDF coordinate space happens here.
struct Painter {
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Painter {
    fn text(&self, s: &str, size: f32, x: f32, y_top: f32, color: (u8, u8, u8)) {
        self.layer.set_fill_color(rgb(color));
        self.layer
            .use_text(s, size.into(), mm(x), mm(PAGE_H - y_top), &self.font);
    }

    fn text_bold(&self, s: &str, size: f32, x: f32, y_top: f32, color: (u8, u8, u8)) {
        self.layer.set_fill_color(rgb(color));
        self.layer
            .use_text(s, size.into(), mm(x), mm(PAGE_H - y_top), &self.bold);
    }

    /// Right-aligned text, using the Helvetica average advance as an
    /// approximation (builtin fonts carry no metrics here).
    fn text_right(&self, s: &str, size: f32, right_x: f32, y_top: f32, color: (u8, u8, u8)) {
        let approx_width = s.chars().count() as f32 * size * 0.5 * 0.3528;
        self.text(s, size, right_x - approx_width, y_top, color);
    }

    fn fill_rect(&self, x: f32, y_top: f32, w: f32, h: f32, color: (u8, u8, u8)) {
        self.layer.set_fill_color(rgb(color));
        let points = calculate_points_for_rect(
            mm(w),
            mm(h),
            mm(x + w / 2.0),
            mm(PAGE_H - y_top - h / 2.0),
        );
        self.layer.add_polygon(Polygon {
            rings: vec![points],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    fn circle(&self, cx: f32, cy_top: f32, radius: f32, color: (u8, u8, u8)) {
        self.layer.set_fill_color(rgb(color));
        let points = calculate_points_for_circle(mm(radius), mm(cx), mm(PAGE_H - cy_top));
        self.layer.add_polygon(Polygon {
            rings: vec![points],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }
}

// --- table rendering ---

struct TableRow {
    cells: Vec<String>,
    bold: bool,
    fill: Option<(u8, u8, u8)>,
    text_color: (u8, u8, u8),
    dot: Option<(u8, u8, u8)>,
}

impl TableRow {
    fn plain(cells: Vec<String>) -> Self {
        Self {
            cells,
            bold: false,
            fill: None,
            text_color: DARK,
            dot: None,
        }
    }
}

const ROW_H: f32 = 7.0;

/// Striped table with a colored header band. Returns the y coordinate just
/// below the last row.
fn draw_table(p: &Painter, y_top: f32, widths: &[f32], header: &[&str], rows: &[TableRow]) -> f32 {
    let mut y = y_top;

    p.fill_rect(MARGIN, y, CONTENT_W, ROW_H + 1.0, PRIMARY);
    let mut x = MARGIN;
    for (i, title) in header.iter().enumerate() {
        p.text_bold(title, 9.0, x + 2.0, y + 5.3, WHITE);
        x += widths[i];
    }
    y += ROW_H + 1.0;

    for (row_idx, row) in rows.iter().enumerate() {
        if let Some(fill) = row.fill {
            p.fill_rect(MARGIN, y, CONTENT_W, ROW_H, fill);
        } else if row_idx % 2 == 1 {
            p.fill_rect(MARGIN, y, CONTENT_W, ROW_H, LIGHT);
        }
        let mut x = MARGIN;
        let last = row.cells.len() - 1;
        for (i, cell) in row.cells.iter().enumerate() {
            let offset = match row.dot {
                Some(dot) if i == last => {
                    p.circle(x + 3.0, y + ROW_H / 2.0, 1.5, dot);
                    6.0
                }
                _ => 2.0,
            };
            if row.bold {
                p.text_bold(cell, 8.5, x + offset, y + 5.0, row.text_color);
            } else {
                p.text(cell, 8.5, x + offset, y + 5.0, row.text_color);
            }
            x += widths[i];
        }
        y += ROW_H;
    }
    y
}

fn page_header(p: &Painter, title: &str, page_num: usize) {
    p.fill_rect(0.0, 0.0, PAGE_W, 12.0, PRIMARY);
    p.text("BOCADI — Reporte Nutricional", 8.0, MARGIN, 8.0, WHITE);
    p.text_right(&format!("Página {page_num}"), 8.0, PAGE_W - MARGIN, 8.0, WHITE);
    p.text_bold(title, 13.0, MARGIN, 22.0, DARK);
    p.fill_rect(MARGIN, 24.5, CONTENT_W, 0.5, PRIMARY);
}

fn page_footer(p: &Painter, opts: &ReportOptions<'_>) {
    p.text(
        &format!(
            "Generado por Bocadi · {} · {}",
            fmt_date(opts.generated_on),
            opts.requested_by
        ),
        7.0,
        MARGIN,
        PAGE_H - 6.0,
        GRAY,
    );
}

// --- daily detail rows (pure, tested separately) ---

#[derive(Debug, PartialEq)]
pub(crate) enum DailyRow {
    Dish {
        day: DayOfWeek,
        dish: String,
        kcal: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    },
    Subtotal {
        day: DayOfWeek,
        kcal: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    },
    GrandTotal {
        kcal: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    },
}

/// Monday-to-Sunday dish rows plus per-day subtotals; days without entries
/// produce no rows at all. Always closed by the weekly grand total.
pub(crate) fn daily_rows(entries: &[EntryWithDish]) -> Vec<DailyRow> {
    let mut rows = Vec::new();

    for day in DayOfWeek::ALL {
        let day_entries = aggregate::day_entries(entries, day);
        if day_entries.is_empty() {
            continue;
        }
        let (mut kcal, mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0, 0.0);
        for e in day_entries {
            let k = aggregate::dish_total(e, Nutrient::Kcal);
            let p = aggregate::dish_total(e, Nutrient::ProteinG);
            let c = aggregate::dish_total(e, Nutrient::CarbsG);
            let f = aggregate::dish_total(e, Nutrient::FatG);
            rows.push(DailyRow::Dish {
                day,
                dish: e.dish.dish.name.clone(),
                kcal: k,
                protein: p,
                carbs: c,
                fat: f,
            });
            kcal += k;
            protein += p;
            carbs += c;
            fat += f;
        }
        rows.push(DailyRow::Subtotal {
            day,
            kcal,
            protein,
            carbs,
            fat,
        });
    }

    rows.push(DailyRow::GrandTotal {
        kcal: aggregate::total(entries, Nutrient::Kcal),
        protein: aggregate::total(entries, Nutrient::ProteinG),
        carbs: aggregate::total(entries, Nutrient::CarbsG),
        fat: aggregate::total(entries, Nutrient::FatG),
    });
    rows
}

// --- the report itself ---

pub fn render(opts: &ReportOptions<'_>) -> anyhow::Result<Vec<u8>> {
    let (doc, cover_page, cover_layer) = PdfDocument::new(
        "Reporte Nutricional Semanal",
        mm(PAGE_W),
        mm(PAGE_H),
        "contenido",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let total = |n: Nutrient| aggregate::total(opts.entries, n);

    let painter_for = |page, layer| Painter {
        layer: doc.get_page(page).get_layer(layer),
        font: font.clone(),
        bold: bold.clone(),
    };

    // Page 1 — cover
    {
        let p = painter_for(cover_page, cover_layer);
        draw_cover(&p, opts, &total);
        page_footer(&p, opts);
    }

    // Page 2 — executive summary
    {
        let (page, layer) = doc.add_page(mm(PAGE_W), mm(PAGE_H), "contenido");
        let p = painter_for(page, layer);
        page_header(&p, "Resumen Ejecutivo", 2);
        draw_executive_summary(&p, opts, &total);
        page_footer(&p, opts);
    }

    // Page 3 — daily detail
    {
        let (page, layer) = doc.add_page(mm(PAGE_W), mm(PAGE_H), "contenido");
        let p = painter_for(page, layer);
        page_header(&p, "Detalle Diario", 3);
        draw_daily_detail(&p, opts);
        page_footer(&p, opts);
    }

    // Page 4 — micronutrients
    {
        let (page, layer) = doc.add_page(mm(PAGE_W), mm(PAGE_H), "contenido");
        let p = painter_for(page, layer);
        page_header(&p, "Micronutrientes", 4);
        draw_micronutrients(&p, opts, &total);
        page_footer(&p, opts);
    }

    // Page 5 — protein balance
    {
        let (page, layer) = doc.add_page(mm(PAGE_W), mm(PAGE_H), "contenido");
        let p = painter_for(page, layer);
        page_header(&p, "Balance Proteico", 5);
        draw_protein_balance(&p, opts, &total);
        page_footer(&p, opts);
    }

    let mut bytes: Vec<u8> = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))?;
    Ok(bytes)
}

fn draw_cover(p: &Painter, opts: &ReportOptions<'_>, total: &dyn Fn(Nutrient) -> f64) {
    p.fill_rect(0.0, 0.0, PAGE_W, 70.0, PRIMARY);
    p.text_bold("BOCADI", 32.0, MARGIN, 40.0, WHITE);
    p.text("Planificador Nutricional", 11.0, MARGIN, 50.0, WHITE);

    if let Some(nut) = opts.nutritionist {
        if let Some(name) = nut.name.as_deref() {
            p.text_right(name, 9.0, PAGE_W - MARGIN, 35.0, WHITE);
            if let Some(license) = nut.license_number.as_deref() {
                p.text_right(license, 9.0, PAGE_W - MARGIN, 42.0, WHITE);
            }
        }
    }

    p.text_bold("Reporte Nutricional Semanal", 20.0, MARGIN, 90.0, DARK);
    p.text(
        &format!("Paciente / Workspace: {}", opts.workspace_name),
        11.0,
        MARGIN,
        105.0,
        GRAY,
    );
    p.text(
        &format!("Solicitado por: {}", opts.requested_by),
        11.0,
        MARGIN,
        113.0,
        GRAY,
    );
    p.text(
        &format!(
            "Período: {} — {}",
            fmt_date(opts.week_start),
            fmt_date(opts.week_end)
        ),
        11.0,
        MARGIN,
        121.0,
        GRAY,
    );

    if let Some(nut) = opts.nutritionist {
        if let Some(name) = nut.name.as_deref() {
            p.text(&format!("Nutricionista: {name}"), 11.0, MARGIN, 133.0, GRAY);
            if let Some(license) = nut.license_number.as_deref() {
                p.text(&format!("Colegiatura: {license}"), 11.0, MARGIN, 141.0, GRAY);
            }
        }
    }

    // quick summary box
    p.fill_rect(MARGIN, 155.0, CONTENT_W, 60.0, LIGHT);
    p.text_bold("Resumen de la semana", 10.0, MARGIN + 5.0, 165.0, DARK);

    let items = [
        (Nutrient::Kcal, format!("{} kcal", fmt_int(total(Nutrient::Kcal)))),
        (Nutrient::ProteinG, format!("{:.1} g", total(Nutrient::ProteinG))),
        (Nutrient::CarbsG, format!("{:.1} g", total(Nutrient::CarbsG))),
        (Nutrient::FatG, format!("{:.1} g", total(Nutrient::FatG))),
    ];
    for (i, (nutrient, value)) in items.iter().enumerate() {
        let x = MARGIN + 5.0 + (i % 2) as f32 * (CONTENT_W / 2.0);
        let y = 175.0 + (i / 2) as f32 * 22.0;
        let pct = coverage_pct(total(*nutrient), opts.refs.get(*nutrient));
        let sem = Semaphore::classify(pct);
        p.circle(x + 2.0, y + 1.0, 2.0, sem.color());
        p.text(nutrient.label_es(), 9.0, x + 6.0, y + 2.0, GRAY);
        p.text_bold(value, 11.0, x + 6.0, y + 9.0, DARK);
        p.text(
            &format!("{pct:.0}% del objetivo semanal"),
            8.0,
            x + 6.0,
            y + 15.0,
            GRAY,
        );
    }
}

fn draw_executive_summary(p: &Painter, opts: &ReportOptions<'_>, total: &dyn Fn(Nutrient) -> f64) {
    let mut y = 32.0;

    // macro cards
    let cards = [
        Nutrient::Kcal,
        Nutrient::ProteinG,
        Nutrient::CarbsG,
        Nutrient::FatG,
    ];
    let card_w = (CONTENT_W - 9.0) / 4.0;
    for (i, nutrient) in cards.iter().enumerate() {
        let x = MARGIN + i as f32 * (card_w + 3.0);
        let actual = total(*nutrient);
        let pct = coverage_pct(actual, opts.refs.get(*nutrient));
        let sem = Semaphore::classify(pct);
        p.fill_rect(x, y, card_w, 28.0, LIGHT);
        p.fill_rect(x, y, card_w, 2.0, sem.color());
        p.text(nutrient.label_es(), 8.0, x + 3.0, y + 8.0, GRAY);
        p.text_bold(&fmt_int(actual), 14.0, x + 3.0, y + 18.0, DARK);
        p.text(
            &format!("{} · {pct:.0}%", nutrient.unit_label()),
            7.0,
            x + 3.0,
            y + 24.0,
            GRAY,
        );
    }
    y += 35.0;

    // caloric macro distribution: protein/carbs 4 kcal per gram, fat 9
    let protein_kcal = total(Nutrient::ProteinG) * 4.0;
    let carbs_kcal = total(Nutrient::CarbsG) * 4.0;
    let fat_kcal = total(Nutrient::FatG) * 9.0;
    let energy_total = protein_kcal + carbs_kcal + fat_kcal;

    if energy_total > 0.0 {
        p.text_bold(
            "Distribución de macronutrientes (% calorías)",
            10.0,
            MARGIN,
            y + 5.0,
            DARK,
        );
        y += 10.0;

        let segments = [
            ("Proteínas", protein_kcal, (99, 102, 241)),
            ("Carbohidratos", carbs_kcal, (251, 191, 36)),
            ("Grasas", fat_kcal, (239, 68, 68)),
        ];
        let bar_h = 8.0;
        let mut x_bar = MARGIN;
        for (_, kcal, color) in segments {
            let w = CONTENT_W * (kcal / energy_total) as f32;
            if w > 0.0 {
                p.fill_rect(x_bar, y, w, bar_h, color);
                x_bar += w;
            }
        }
        y += bar_h + 4.0;

        for (i, (label, kcal, color)) in segments.iter().enumerate() {
            let x = MARGIN + i as f32 * 55.0;
            let pct = kcal / energy_total * 100.0;
            p.fill_rect(x, y, 5.0, 4.0, *color);
            p.text(&format!("{label} {pct:.1}%"), 8.0, x + 7.0, y + 4.0, DARK);
        }
        y += 12.0;
    }

    // semaphore table over the four macros
    p.text_bold(
        "Semáforo nutricional (vs. referencia semanal)",
        10.0,
        MARGIN,
        y + 5.0,
        DARK,
    );
    y += 10.0;

    let rows: Vec<TableRow> = cards
        .iter()
        .map(|&nutrient| {
            let actual = total(nutrient);
            let reference = opts.refs.get(nutrient);
            let pct = coverage_pct(actual, reference);
            let sem = Semaphore::classify(pct);
            TableRow {
                cells: vec![
                    nutrient.label_es().to_string(),
                    format!("{actual:.1} {}", nutrient.unit_label()),
                    format!("{reference:.0} {}", nutrient.unit_label()),
                    format!("{pct:.0}%"),
                    sem.label_es().to_string(),
                ],
                bold: false,
                fill: None,
                text_color: DARK,
                dot: Some(sem.color()),
            }
        })
        .collect();

    draw_table(
        p,
        y,
        &[45.0, 40.0, 35.0, 30.0, 30.0],
        &["Nutriente", "Total semana", "Referencia", "% cubierto", "Estado"],
        &rows,
    );
}

fn draw_daily_detail(p: &Painter, opts: &ReportOptions<'_>) {
    let rows: Vec<TableRow> = daily_rows(opts.entries)
        .into_iter()
        .map(|row| match row {
            DailyRow::Dish {
                day,
                dish,
                kcal,
                protein,
                carbs,
                fat,
            } => TableRow::plain(vec![
                day.label_es().to_string(),
                dish,
                fmt_int(kcal),
                fmt_g(protein),
                fmt_g(carbs),
                fmt_g(fat),
            ]),
            DailyRow::Subtotal {
                day,
                kcal,
                protein,
                carbs,
                fat,
            } => TableRow {
                cells: vec![
                    format!("Subtotal {}", day.label_es()),
                    String::new(),
                    fmt_int(kcal),
                    fmt_g(protein),
                    fmt_g(carbs),
                    fmt_g(fat),
                ],
                bold: true,
                fill: None,
                text_color: DARK,
                dot: None,
            },
            DailyRow::GrandTotal {
                kcal,
                protein,
                carbs,
                fat,
            } => TableRow {
                cells: vec![
                    "TOTAL SEMANAL".to_string(),
                    String::new(),
                    fmt_int(kcal),
                    fmt_g(protein),
                    fmt_g(carbs),
                    fmt_g(fat),
                ],
                bold: true,
                fill: Some(PRIMARY),
                text_color: WHITE,
                dot: None,
            },
        })
        .collect();

    draw_table(
        p,
        32.0,
        &[32.0, 76.0, 18.0, 18.0, 18.0, 18.0],
        &["Día", "Plato", "Kcal", "Prot", "Carbs", "Grasas"],
        &rows,
    );
}

const MICRONUTRIENTS: [Nutrient; 7] = [
    Nutrient::FiberG,
    Nutrient::SodiumMg,
    Nutrient::VitaminCMg,
    Nutrient::VitaminDUi,
    Nutrient::CalciumMg,
    Nutrient::IronMg,
    Nutrient::PotassiumMg,
];

fn draw_micronutrients(p: &Painter, opts: &ReportOptions<'_>, total: &dyn Fn(Nutrient) -> f64) {
    let rows: Vec<TableRow> = MICRONUTRIENTS
        .iter()
        .map(|&nutrient| {
            let actual = total(nutrient);
            let reference = opts.refs.get(nutrient);
            let pct = coverage_pct(actual, reference);
            let sem = Semaphore::classify(pct);
            TableRow {
                cells: vec![
                    nutrient.label_es().to_string(),
                    format!("{actual:.1} {}", nutrient.unit_label()),
                    format!("{reference:.0} {}", nutrient.unit_label()),
                    format!("{pct:.0}%"),
                    sem.label_es().to_string(),
                ],
                bold: false,
                fill: None,
                text_color: DARK,
                dot: Some(sem.color()),
            }
        })
        .collect();

    let after = draw_table(
        p,
        32.0,
        &[45.0, 40.0, 35.0, 30.0, 30.0],
        &["Nutriente", "Total semana", "Ref. semanal", "% cubierto", "Estado"],
        &rows,
    );

    let legend_y = after + 8.0;
    p.text_bold("Leyenda:", 8.0, MARGIN, legend_y, DARK);
    let legend = [
        (Semaphore::Optimal, "Óptimo: 80-120% del valor de referencia"),
        (Semaphore::Review, "Revisar: 50-79% o 121-150%"),
        (Semaphore::Critical, "Crítico: < 50% o > 150%"),
    ];
    for (i, (sem, text)) in legend.iter().enumerate() {
        let y = legend_y + 6.0 + i as f32 * 7.0;
        p.circle(MARGIN + 3.0, y, 2.0, sem.color());
        p.text(text, 8.0, MARGIN + 7.0, y + 2.0, GRAY);
    }
}

fn draw_protein_balance(p: &Painter, opts: &ReportOptions<'_>, total: &dyn Fn(Nutrient) -> f64) {
    let buckets = aggregate::protein_buckets(opts.entries);
    let max_grams = buckets
        .iter()
        .map(|b| b.grams)
        .fold(1.0_f64, f64::max);

    let mut y = 35.0;
    p.text_bold("Distribución de proteínas por tipo", 10.0, MARGIN, y, DARK);
    y += 8.0;

    for bucket in &buckets {
        // bars scale to the largest bucket, not the page width
        let bar_w = ((bucket.grams / max_grams) as f32) * (CONTENT_W - 50.0);
        p.text(&bucket.name, 8.0, MARGIN, y + 4.0, DARK);
        p.fill_rect(MARGIN + 40.0, y, bar_w.max(0.5), 7.0, parse_hex_color(&bucket.color));
        let plural = if bucket.dish_count == 1 { "" } else { "s" };
        p.text(
            &format!(
                "{:.1}g ({} plato{plural})",
                bucket.grams, bucket.dish_count
            ),
            8.0,
            MARGIN + 40.0 + bar_w + 3.0,
            y + 5.0,
            GRAY,
        );
        y += 12.0;
    }

    if total(Nutrient::ProteinG) > 0.0 {
        y += 5.0;
        let rows: Vec<TableRow> = buckets
            .iter()
            .map(|b| {
                TableRow::plain(vec![
                    b.name.clone(),
                    format!("{:.1} g", b.grams),
                    format!("{:.1}%", b.percentage),
                    b.dish_count.to_string(),
                ])
            })
            .collect();
        draw_table(
            p,
            y,
            &[60.0, 40.0, 45.0, 35.0],
            &["Tipo de proteína", "Gramos totales", "% del total proteico", "N° de platos"],
            &rows,
        );
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::report::aggregate::tests::{entry, ingredient, protein_type};

    #[test]
    fn test_report_filename_sanitizes_workspace_name() {
        let name = report_filename(
            "Clínica Sur #2",
            date!(2024 - 03 - 04),
            date!(2024 - 03 - 10),
        );
        assert_eq!(name, "bocadi-reporte-cl-nica-sur--2-2024-03-04_2024-03-10.pdf");
    }

    #[test]
    fn test_report_filename_plain_name() {
        let name = report_filename("demo", date!(2025 - 01 - 06), date!(2025 - 01 - 12));
        assert_eq!(name, "bocadi-reporte-demo-2025-01-06_2025-01-12.pdf");
    }

    #[test]
    fn test_daily_rows_omit_empty_days() {
        let entries = vec![
            entry(
                DayOfWeek::Monday,
                "Arroz con pollo",
                None,
                vec![ingredient(500.0, 30.0, 2.0)],
            ),
            entry(
                DayOfWeek::Thursday,
                "Ceviche",
                None,
                vec![ingredient(300.0, 25.0, 4.0)],
            ),
        ];

        let rows = daily_rows(&entries);
        // one dish row + subtotal per populated day, plus the grand total
        assert_eq!(rows.len(), 5);
        assert!(matches!(&rows[0], DailyRow::Dish { day: DayOfWeek::Monday, .. }));
        assert!(matches!(&rows[1], DailyRow::Subtotal { day: DayOfWeek::Monday, kcal, .. } if *kcal == 500.0));
        assert!(matches!(&rows[2], DailyRow::Dish { day: DayOfWeek::Thursday, .. }));
        assert!(matches!(&rows[3], DailyRow::Subtotal { day: DayOfWeek::Thursday, .. }));
        assert!(matches!(&rows[4], DailyRow::GrandTotal { kcal, .. } if *kcal == 800.0));
    }

    #[test]
    fn test_daily_rows_empty_week_is_just_the_grand_total() {
        let rows = daily_rows(&[]);
        assert_eq!(rows.len(), 1);
        assert!(matches!(&rows[0], DailyRow::GrandTotal { kcal, .. } if *kcal == 0.0));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#F5A623"), (0xf5, 0xa6, 0x23));
        assert_eq!(parse_hex_color("9CA3AF"), (0x9c, 0xa3, 0xaf));
        assert_eq!(parse_hex_color("nope"), GRAY);
    }

    #[test]
    fn test_parse_hex_color_multibyte_falls_back_to_gray() {
        // 6 bytes but only 4 chars; byte-indexing this would split a char
        assert_eq!(parse_hex_color("aéaé"), GRAY);
        assert_eq!(parse_hex_color("#ñññ"), GRAY);
    }

    #[test]
    fn test_render_survives_malformed_protein_type_color() {
        let pt = protein_type(10, "Pollo", "aéaé");
        let entries = vec![entry(
            DayOfWeek::Monday,
            "Arroz con pollo",
            Some(pt),
            vec![ingredient(650.0, 35.0, 3.5)],
        )];
        let opts = ReportOptions {
            entries: &entries,
            week_start: date!(2024 - 03 - 04),
            week_end: date!(2024 - 03 - 10),
            workspace_name: "Demo",
            requested_by: "demo@bocadi.app",
            nutritionist: None,
            refs: WeeklyReferences::default(),
            generated_on: date!(2024 - 03 - 11),
        };
        let bytes = render(&opts).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_produces_a_pdf_even_for_an_empty_week() {
        let opts = ReportOptions {
            entries: &[],
            week_start: date!(2024 - 03 - 04),
            week_end: date!(2024 - 03 - 10),
            workspace_name: "Demo",
            requested_by: "demo@bocadi.app",
            nutritionist: None,
            refs: WeeklyReferences::default(),
            generated_on: date!(2024 - 03 - 11),
        };
        let bytes = render(&opts).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_render_full_week() {
        let pt = protein_type(10, "Pollo", "#F5A623");
        let entries = vec![
            entry(
                DayOfWeek::Monday,
                "Arroz con pollo",
                Some(pt),
                vec![ingredient(650.0, 35.0, 3.5), ingredient(130.0, 2.7, 0.8)],
            ),
            entry(
                DayOfWeek::Sunday,
                "Ensalada",
                None,
                vec![ingredient(120.0, 4.0, 1.2)],
            ),
        ];
        let opts = ReportOptions {
            entries: &entries,
            week_start: date!(2024 - 03 - 04),
            week_end: date!(2024 - 03 - 10),
            workspace_name: "Clínica Sur #2",
            requested_by: "nutri@clinica.pe",
            nutritionist: None,
            refs: WeeklyReferences::default(),
            generated_on: date!(2024 - 03 - 11),
        };
        let bytes = render(&opts).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
