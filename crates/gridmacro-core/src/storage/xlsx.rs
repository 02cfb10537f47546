//! Spreadsheet-binary codec (`.xlsx`).
//!
//! Values are read with calamine. Cell colors are not exposed by calamine,
//! so `styles.xml` and the first worksheet are scanned directly for each
//! cell's style index and the fill/font colors it resolves to.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{Data, Reader as _, open_workbook_auto};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use zip::ZipArchive;

use super::check_extent;
use crate::error::{GridError, Result};
use gridmacro_engine::engine::{CellPos, CellRecord, Rgb, Snapshot, format_float};

/// Fill value meaning "no color"; read back as white.
const NO_FILL: &str = "00000000";
const BORDER_COLOR: u32 = 0xD3D3D3;
const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn cell_format(record: &CellRecord) -> Format {
    Format::new()
        .set_background_color(Color::RGB(record.color.to_u32()))
        .set_font_color(Color::RGB(record.text_color.to_u32()))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(BORDER_COLOR))
}

/// Write one worksheet; every cell gets its fill, font color and a thin
/// light-gray border.
pub fn write_xlsx(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (pos, record) in snapshot {
        let row = u32::try_from(pos.row)
            .map_err(|_| GridError::Corrupt(format!("row {} does not fit a worksheet", pos.row)))?;
        let col = u16::try_from(pos.col).map_err(|_| {
            GridError::Corrupt(format!("column {} does not fit a worksheet", pos.col))
        })?;
        let format = cell_format(record);
        if record.value.is_empty() {
            worksheet.write_blank(row, col, &format)?;
        } else {
            worksheet.write_string_with_format(row, col, &record.value, &format)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Fill and font color for one `cellXfs` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellStyle {
    background: Rgb,
    foreground: Rgb,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            background: Rgb::WHITE,
            foreground: Rgb::BLACK,
        }
    }
}

/// Read the first worksheet.
///
/// Cell references are bounded before calamine builds its dense range, so a
/// far-away cell fails here instead of allocating the gap.
pub fn read_xlsx(path: &Path) -> Result<Snapshot> {
    let styles = read_styles(path)?;
    check_extent(styles.keys())?;
    let values = read_values(path)?;
    check_extent(values.keys())?;

    let positions: BTreeSet<CellPos> = values.keys().chain(styles.keys()).copied().collect();
    Ok(positions
        .into_iter()
        .map(|pos| {
            let style = styles.get(&pos).copied().unwrap_or_default();
            let record = CellRecord {
                value: values.get(&pos).cloned().unwrap_or_default(),
                color: style.background,
                text_color: style.foreground,
            };
            (pos, record)
        })
        .collect())
}

fn data_to_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<CellPos, String>> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Ok(BTreeMap::new());
    };
    let range = workbook.worksheet_range(&first)?;
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    Ok(range
        .used_cells()
        .map(|(row, col, data)| {
            let pos = CellPos::new(start_row as usize + row, start_col as usize + col);
            (pos, data_to_text(data))
        })
        .collect())
}

fn read_styles(path: &Path) -> Result<BTreeMap<CellPos, CellStyle>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let styles = match read_zip_file(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_style_table(&xml)?,
        None => Vec::new(),
    };
    let sheet_path = first_sheet_path(&mut archive)?;
    let Some(sheet_xml) = read_zip_file(&mut archive, &sheet_path)? else {
        return Err(GridError::Corrupt(format!("missing worksheet {}", sheet_path)));
    };

    Ok(parse_cell_style_ids(&sheet_xml)?
        .into_iter()
        .map(|(pos, id)| (pos, styles.get(id).copied().unwrap_or_default()))
        .collect())
}

/// Read a file from the archive; `None` when it is absent.
fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Archive path of the first worksheet listed in `workbook.xml`.
fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let workbook = read_zip_file(archive, "xl/workbook.xml")?.unwrap_or_default();
    let rels = read_zip_file(archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();

    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"sheet" => {
                rel_id = attr(e, b"r:id");
                break;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    let Some(rel_id) = rel_id else {
        return Ok(DEFAULT_SHEET.to_string());
    };

    let mut reader = Reader::from_str(&rels);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.name().as_ref() == b"Relationship"
                    && attr(e, b"Id").as_deref() == Some(rel_id.as_str()) =>
            {
                if let Some(target) = attr(e, b"Target") {
                    return Ok(match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(DEFAULT_SHEET.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Section {
    #[default]
    Other,
    Fonts,
    Fills,
    CellXfs,
}

#[derive(Debug, Default)]
struct StyleTableBuilder {
    section: Section,
    fonts: Vec<Option<Rgb>>,
    fills: Vec<Option<Rgb>>,
    xfs: Vec<(usize, usize)>,
    current: Option<Rgb>,
}

impl StyleTableBuilder {
    fn open(&mut self, e: &BytesStart, empty: bool) {
        match (self.section, e.name().as_ref()) {
            (_, b"fonts") if !empty => self.section = Section::Fonts,
            (_, b"fills") if !empty => self.section = Section::Fills,
            (_, b"cellXfs") if !empty => self.section = Section::CellXfs,
            (Section::Fonts, b"font") | (Section::Fills, b"fill") => {
                self.current = None;
                if empty {
                    self.finish_entry();
                }
            }
            (Section::Fonts, b"color") => {
                self.current = attr(e, b"rgb").and_then(|hex| Rgb::from_hex(&hex));
            }
            (Section::Fills, b"fgColor") => {
                self.current = attr(e, b"rgb")
                    .filter(|hex| hex != NO_FILL)
                    .and_then(|hex| Rgb::from_hex(&hex));
            }
            (Section::CellXfs, b"xf") => {
                let id = |key: &[u8]| {
                    attr(e, key)
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0)
                };
                self.xfs.push((id(b"fontId"), id(b"fillId")));
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"font" | b"fill" => self.finish_entry(),
            b"fonts" | b"fills" | b"cellXfs" => self.section = Section::Other,
            _ => {}
        }
    }

    fn finish_entry(&mut self) {
        let color = self.current.take();
        match self.section {
            Section::Fonts => self.fonts.push(color),
            Section::Fills => self.fills.push(color),
            _ => {}
        }
    }

    fn build(self) -> Vec<CellStyle> {
        self.xfs
            .iter()
            .map(|&(font, fill)| CellStyle {
                background: self.fills.get(fill).copied().flatten().unwrap_or(Rgb::WHITE),
                foreground: self.fonts.get(font).copied().flatten().unwrap_or(Rgb::BLACK),
            })
            .collect()
    }
}

/// Resolve every `cellXfs` entry to its fill and font color.
fn parse_style_table(xml: &str) -> Result<Vec<CellStyle>> {
    let mut builder = StyleTableBuilder::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => builder.open(e, false),
            Event::Empty(ref e) => builder.open(e, true),
            Event::End(ref e) => builder.close(e.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(builder.build())
}

/// `(position, style index)` for every `<c>` element of a worksheet.
fn parse_cell_style_ids(xml: &str) -> Result<Vec<(CellPos, usize)>> {
    let mut cells = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"c" => {
                if let Some(reference) = attr(e, b"r") {
                    let pos = parse_cell_ref(&reference).ok_or_else(|| {
                        GridError::Corrupt(format!("bad cell reference '{}'", reference))
                    })?;
                    let style = attr(e, b"s").and_then(|s| s.parse().ok()).unwrap_or(0);
                    cells.push((pos, style));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}

/// `"B5"` -> (4, 1).
fn parse_cell_ref(reference: &str) -> Option<CellPos> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let col = letters
        .bytes()
        .try_fold(0usize, |acc, b| acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize))?;
    let row: usize = digits.parse().ok()?;
    Some(CellPos::new(row.checked_sub(1)?, col - 1))
}
