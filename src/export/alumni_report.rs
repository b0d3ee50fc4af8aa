//! Spreadsheet report over alumni responses.

use crate::domain::models::AlumniSurvey;
use crate::domain::scoring::Classification;
use crate::domain::statistics::{alumni_report, classification_of, scale_values, text_values, ReportLayout};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::*;

pub const SHEET_NAME: &str = "Laporan Survey";

const IDENTITY_HEADERS: [&str; 12] = [
    "No",
    "Waktu Dibuat",
    "Waktu Submit",
    "Nama Penilai",
    "Perusahaan",
    "Tingkat Perusahaan",
    "Jabatan Penilai",
    "Nama Alumni",
    "NIM",
    "Prodi",
    "Tahun Lulus",
    "Masa Kerja",
];

const SCORE_HEADERS: [&str; 2] = ["Total Skor", "Kesimpulan Penilaian"];

const ASPECT_TABLE_HEADERS: [&str; 5] = [
    "Penilaian (Aspek)",
    "Sangat Baik (5)",
    "Baik (4)",
    "Cukup (3)",
    "Kurang Baik (<=2)",
];

const SUMMARY_COL: u16 = 1;
const ASPECT_COL: u16 = 4;

pub fn filename(now: DateTime<Utc>) -> String {
    format!("Laporan_Survey_Lengkap_{}.xlsx", now.format("%Y-%m-%d_%H%M%S"))
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%d-%m-%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Excel refuses longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

/// Cuts stored text to what a cell can hold.
fn cell_text(value: &str) -> &str {
    match value.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

fn people(count: i64) -> String {
    format!("{count} Orang")
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD9D9D9))
        .set_border(FormatBorder::Thin)
}

fn title_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_size(12)
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0xD9D9D9))
        .set_border(FormatBorder::Thin)
}

fn cell_format() -> Format {
    Format::new().set_border(FormatBorder::Thin)
}

fn centered_format() -> Format {
    Format::new().set_border(FormatBorder::Thin).set_align(FormatAlign::Center)
}

fn bold_format() -> Format {
    Format::new().set_bold().set_border(FormatBorder::Thin).set_align(FormatAlign::Center)
}

/// Builds the full report: one row per response, then the overall classification
/// table and the per-aspect table beneath it.
pub fn format_spreadsheet(layout: &ReportLayout, responses: &[AlumniSurvey]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = header_format();
    let cell = cell_format();
    let centered = centered_format();
    let bold = bold_format();
    let title = title_format();

    let headers: Vec<&str> = IDENTITY_HEADERS
        .iter()
        .copied()
        .chain(layout.aspects.iter().map(String::as_str))
        .chain(SCORE_HEADERS.iter().copied())
        .chain(layout.text_columns.iter().map(String::as_str))
        .collect();

    for (col, text) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *text, &header)?;
        sheet.set_column_width(col as u16, if col == 0 { 5 } else { 18 })?;
    }

    let mut row: u32 = 1;
    for (index, response) in responses.iter().enumerate() {
        let completed = response.status.is_completed();
        let mut col: u16 = 0;

        sheet.write_number_with_format(row, col, (index + 1) as f64, &cell)?;
        col += 1;
        sheet.write_string_with_format(row, col, timestamp(Some(response.created_at)), &cell)?;
        col += 1;
        let submitted = if completed { response.submitted_at } else { None };
        sheet.write_string_with_format(row, col, timestamp(submitted), &cell)?;
        col += 1;

        for value in [
            &response.evaluator_name,
            &response.company_name,
            &response.company_level,
            &response.evaluator_position,
            &response.alumni_name,
            &response.alumni_nim,
            &response.study_program,
            &response.graduation_year,
            &response.work_period,
        ] {
            sheet.write_string_with_format(row, col, cell_text(value), &cell)?;
            col += 1;
        }

        let scores = scale_values(response);
        for i in 0..layout.aspects.len() {
            match scores.get(i) {
                Some(value) => sheet.write_number_with_format(row, col, *value as f64, &centered)?,
                None => sheet.write_string_with_format(row, col, "-", &centered)?,
            };
            col += 1;
        }

        if completed {
            sheet.write_number_with_format(row, col, response.total_score as f64, &centered)?;
        } else {
            sheet.write_string_with_format(row, col, "-", &centered)?;
        }
        col += 1;

        let verdict = match classification_of(response) {
            Classification::Belum => "Belum Mengisi",
            other => other.label(),
        };
        sheet.write_string_with_format(row, col, verdict, &cell)?;
        col += 1;

        let texts = text_values(response);
        for i in 0..layout.text_columns.len() {
            sheet.write_string_with_format(row, col, cell_text(texts.get(i).copied().unwrap_or("-")), &cell)?;
            col += 1;
        }

        row += 1;
    }

    let report = alumni_report(layout, responses);
    let start = row + 3;

    // Overall classification.
    let mut r = start;
    sheet.merge_range(r, SUMMARY_COL, r, SUMMARY_COL + 1, "Tabel Kesimpulan Akhir", &title)?;
    r += 1;
    sheet.write_string_with_format(r, SUMMARY_COL, "Kategori Penilaian", &bold)?;
    sheet.write_string_with_format(r, SUMMARY_COL + 1, "Jumlah Responden", &bold)?;
    r += 1;
    for category in Classification::GRADED {
        sheet.write_string_with_format(r, SUMMARY_COL, category.label(), &cell)?;
        sheet.write_string_with_format(r, SUMMARY_COL + 1, people(report.summary.counts.get(category)), &centered)?;
        r += 1;
    }
    sheet.write_string_with_format(r, SUMMARY_COL, "Total", &bold)?;
    sheet.write_string_with_format(r, SUMMARY_COL + 1, people(report.summary.completed()), &bold)?;

    // Per aspect.
    let mut r = start;
    sheet.merge_range(
        r,
        ASPECT_COL,
        r,
        ASPECT_COL + ASPECT_TABLE_HEADERS.len() as u16 - 1,
        "Kesimpulan Penilaian Per Aspek",
        &title,
    )?;
    r += 1;
    for (offset, text) in ASPECT_TABLE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(r, ASPECT_COL + offset as u16, *text, &bold)?;
    }
    r += 1;
    for breakdown in &report.aspects {
        sheet.write_string_with_format(r, ASPECT_COL, &breakdown.aspect, &cell)?;
        for (offset, category) in Classification::GRADED.iter().enumerate() {
            sheet.write_string_with_format(
                r,
                ASPECT_COL + 1 + offset as u16,
                people(breakdown.counts.get(*category)),
                &centered,
            )?;
        }
        r += 1;
    }
    sheet.write_string_with_format(r, ASPECT_COL, "Total", &bold)?;
    for (offset, category) in Classification::GRADED.iter().enumerate() {
        sheet.write_string_with_format(
            r,
            ASPECT_COL + 1 + offset as u16,
            people(report.aspect_totals.get(*category)),
            &bold,
        )?;
    }

    workbook
        .save_to_buffer()
        .context("Failed to render alumni survey workbook")
}
