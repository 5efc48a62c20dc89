//! Bidirectional conversion between Arrow arrays and delimited text
//!
//! Text to Arrow goes through Arrow's cast kernels, so every type the
//! cast kernels can parse from a string is accepted as a declared column
//! type. Arrow to text goes through Arrow's display formatters, which are
//! locale independent.

use crate::{BowError, PrimitiveType, Result, RowBatch};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow_array::{Array, ArrayRef, StringArray};
use arrow_schema::DataType;
use std::fmt::Write as _;
use std::sync::Arc;

/// Field values read as nulls
pub const NA_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Map a raw field to `None` when it is one of the NA tokens
pub fn na_to_none(field: &str) -> Option<&str> {
    if NA_VALUES.contains(&field) {
        None
    } else {
        Some(field)
    }
}

/// Infer the narrowest type that every non-null value parses as.
///
/// Integers win over floats, floats over booleans; a column with no
/// non-null values or with any unparseable value is a string column.
pub fn infer_text_type(values: &[Option<&str>]) -> PrimitiveType {
    let mut present = values.iter().flatten().peekable();
    if present.peek().is_none() {
        return PrimitiveType::String;
    }

    let present: Vec<&str> = present.copied().collect();

    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        PrimitiveType::Int64
    } else if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        PrimitiveType::Float64
    } else if present
        .iter()
        .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
    {
        PrimitiveType::Boolean
    } else {
        PrimitiveType::String
    }
}

/// Coerce one text column into an Arrow array of `data_type`.
///
/// `lines` holds the input line number of each value; the first value that
/// cannot be coerced fails the whole column with a parse error naming its line.
pub fn text_column_to_arrow(
    name: &str,
    values: &[Option<&str>],
    lines: &[u64],
    data_type: &DataType,
) -> Result<ArrayRef> {
    let strings: ArrayRef = Arc::new(StringArray::from(values.to_vec()));
    if data_type == &DataType::Utf8 {
        return Ok(strings);
    }

    let options = CastOptions {
        safe: true,
        ..Default::default()
    };
    let array = cast_with_options(&strings, data_type, &options)?;

    // A safe cast turns unparseable values into nulls
    if array.null_count() > strings.null_count() {
        for (idx, value) in values.iter().enumerate() {
            if let Some(value) = value {
                if array.is_null(idx) {
                    let line = lines.get(idx).copied().unwrap_or_default();
                    return Err(BowError::parse(
                        line,
                        format!(
                            "cannot convert '{}' in column '{}' to {}",
                            value, name, data_type
                        ),
                    ));
                }
            }
        }
    }

    Ok(array)
}

/// Options controlling how batches are rendered as delimited text
#[derive(Debug, Clone)]
pub struct TextOutputOptions {
    pub separator: u8,
    pub include_header: bool,
    pub include_index: bool,
}

impl Default for TextOutputOptions {
    fn default() -> Self {
        Self {
            separator: b'\t',
            include_header: false,
            include_index: false,
        }
    }
}

/// Renders a sequence of batches as blocks of delimited text.
///
/// The header line precedes the first block only. Row numbers of the
/// synthetic index keep counting across blocks.
pub struct TextRenderer {
    options: TextOutputOptions,
    header_written: bool,
    rows_rendered: u64,
}

/// A column position in the batch, or the synthetic row number
#[derive(Clone, Copy)]
enum OutputColumn {
    RowNumber,
    Column(usize),
}

impl TextRenderer {
    pub fn new(options: TextOutputOptions) -> Self {
        Self {
            options,
            header_written: false,
            rows_rendered: 0,
        }
    }

    pub fn rows_rendered(&self) -> u64 {
        self.rows_rendered
    }

    pub fn includes_header(&self) -> bool {
        self.options.include_header
    }

    fn layout(&self, names: &[&str], index_columns: &[String]) -> Vec<OutputColumn> {
        let is_index = |idx: &usize| index_columns.iter().any(|name| name.as_str() == names[*idx]);

        let data = (0..names.len()).filter(|idx| !is_index(idx));
        if !self.options.include_index {
            return data.map(OutputColumn::Column).collect();
        }

        let mut layout: Vec<OutputColumn> = (0..names.len())
            .filter(is_index)
            .map(OutputColumn::Column)
            .collect();
        if layout.is_empty() {
            layout.push(OutputColumn::RowNumber);
        }
        layout.extend(data.map(OutputColumn::Column));
        layout
    }

    fn write_header<W: std::io::Write>(
        &mut self,
        out: &mut csv::Writer<W>,
        layout: &[OutputColumn],
        names: &[&str],
    ) -> Result<()> {
        if !self.options.include_header || self.header_written {
            return Ok(());
        }
        for column in layout {
            let name = match column {
                OutputColumn::RowNumber => "",
                OutputColumn::Column(idx) => names[*idx],
            };
            out.write_field(name).map_err(std::io::Error::from)?;
        }
        out.write_record(None::<&[u8]>)
            .map_err(std::io::Error::from)?;
        self.header_written = true;
        Ok(())
    }

    fn text_writer(&self) -> csv::Writer<Vec<u8>> {
        csv::WriterBuilder::new()
            .delimiter(self.options.separator)
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new())
    }

    /// Render the header line alone, for output that has no rows.
    ///
    /// Empty when the header is disabled or already rendered.
    pub fn render_header(&mut self, names: &[&str], index_columns: &[String]) -> Result<String> {
        let layout = self.layout(names, index_columns);
        let mut out = self.text_writer();
        self.write_header(&mut out, &layout, names)?;
        into_text(out)
    }

    /// Render one batch, returning the text block including line terminators
    pub fn render(&mut self, batch: &RowBatch) -> Result<String> {
        let names = batch.column_names();
        let layout = self.layout(&names, batch.index_columns());

        let mut out = self.text_writer();
        self.write_header(&mut out, &layout, &names)?;

        let format_options = FormatOptions::default();
        let formatters = (0..batch.num_columns())
            .map(|idx| ArrayFormatter::try_new(batch.column(idx).as_ref(), &format_options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut cell = String::new();
        for row in 0..batch.num_rows() {
            for column in &layout {
                cell.clear();
                let written = match column {
                    OutputColumn::RowNumber => {
                        write!(cell, "{}", self.rows_rendered + row as u64)
                    }
                    OutputColumn::Column(idx) => write!(cell, "{}", formatters[*idx].value(row)),
                };
                written.map_err(|e| BowError::format(format!("cannot render value: {}", e)))?;
                out.write_field(&cell).map_err(std::io::Error::from)?;
            }
            out.write_record(None::<&[u8]>)
                .map_err(std::io::Error::from)?;
        }
        self.rows_rendered += batch.num_rows() as u64;

        into_text(out)
    }
}

fn into_text(out: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = out
        .into_inner()
        .map_err(|e| BowError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BowError::format(e.to_string()))
}
