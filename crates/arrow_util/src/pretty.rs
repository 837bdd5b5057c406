//! Box table rendering for previews of query results.

use arrow::datatypes::{DataType, Field, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use comfy_table::{Cell, ContentArrangement, Table};

const PRESET: &str = "││──╞═╪╡│    ┬┴┌┐└┘";

/// Cell values longer than this (in chars) are cut off.
const STR_TRUNCATE: usize = 32;

/// Narrowest a column may get before columns start being elided.
const MIN_COLUMN_WIDTH: usize = 10;

/// Render the first rows of a relation as a box table.
///
/// `preview` holds the rows to show, `total_rows` is the size of the full
/// relation and is printed in the footer. When `width` is set, the table is
/// wrapped to fit and middle columns are replaced with `…` if there are too
/// many to fit.
pub fn pretty_format_preview(
    preview: &RecordBatch,
    total_rows: usize,
    width: Option<usize>,
) -> Result<String, ArrowError> {
    let mut table = Table::new();
    table.load_preset(PRESET);

    let schema = preview.schema();
    let num_columns = schema.fields().len();
    if num_columns == 0 {
        return Ok(table.to_string());
    }

    let max_columns = match width {
        Some(width) => {
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_width(width.min(u16::MAX as usize) as u16);
            (width / (MIN_COLUMN_WIDTH + 3)).clamp(1, num_columns)
        }
        None => {
            table.set_content_arrangement(ContentArrangement::Disabled);
            num_columns
        }
    };
    let selection = ColumnSelection::new(num_columns, max_columns);

    table.set_header(selection.cells(schema.fields().iter().map(|f| header(f))));

    let opts = FormatOptions::default().with_null("NULL");
    let formatters = preview
        .columns()
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &opts))
        .collect::<Result<Vec<_>, ArrowError>>()?;

    for row in 0..preview.num_rows() {
        let values = formatters
            .iter()
            .map(|f| f.value(row).try_to_string().map(|s| truncate(&s)))
            .collect::<Result<Vec<_>, ArrowError>>()?;
        table.add_row(selection.cells(values.into_iter()));
    }

    let shown = preview.num_rows();
    let summary = match (total_rows, shown) {
        (1, 1) => "1 row".to_string(),
        (total, shown) if total == shown => format!("{total} rows"),
        (total, shown) => format!("{total} rows ({shown} shown)"),
    };
    let display_columns = selection.display_width();
    table.add_row((0..display_columns).map(|_| Cell::new("───")));
    let mut footer = vec![Cell::new(summary)];
    footer.extend((1..display_columns).map(|_| Cell::new("")));
    table.add_row(footer);

    Ok(table.to_string())
}

/// Which columns make it into the table when some have to be elided.
#[derive(Debug, Clone, Copy)]
struct ColumnSelection {
    total: usize,
    first: usize,
    last: usize,
}

impl ColumnSelection {
    fn new(total: usize, max: usize) -> Self {
        if total <= max {
            return ColumnSelection {
                total,
                first: total,
                last: 0,
            };
        }
        ColumnSelection {
            total,
            first: max.div_ceil(2),
            last: max / 2,
        }
    }

    fn elided(&self) -> bool {
        self.first + self.last < self.total
    }

    fn display_width(&self) -> usize {
        self.first + self.last + self.elided() as usize
    }

    fn cells(&self, items: impl Iterator<Item = String>) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.display_width());
        for (idx, item) in items.enumerate() {
            if idx < self.first || idx >= self.total - self.last {
                cells.push(Cell::new(item));
            }
            if self.elided() && idx + 1 == self.first {
                cells.push(Cell::new("…"));
            }
        }
        cells
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(STR_TRUNCATE) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

fn header(field: &Field) -> String {
    let data_type = match field.data_type() {
        DataType::Timestamp(unit, tz) => {
            let unit = match unit {
                TimeUnit::Second => "s",
                TimeUnit::Millisecond => "ms",
                TimeUnit::Microsecond => "µs",
                TimeUnit::Nanosecond => "ns",
            };
            format!("Timestamp[{unit}, {}]", tz.as_deref().unwrap_or("UTC"))
        }
        other => other.to_string(),
    };
    format!("{}\n──\n{data_type}", truncate(field.name()))
}
