//! Text charts over an exported job table.
//!
//! [`ValueBar`] counts how often each value of a column occurs, [`ValueHist`]
//! buckets a numeric column into equal-width bins.

use std::{fmt, io, path::Path};

use fxhash::FxHashMap;
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::config::ExportFormat;


const BAR_WIDTH: usize = 40;


#[derive(Debug, Error)]
pub(crate) enum SummaryError {
    #[error("failed to read the table: {0}")]
    Csv(#[from] csv::Error),
    #[error("there is no column named {column:?}, the table has {available}")]
    UnknownColumn {
        column: String,
        available: String
    },
    #[error("column {column:?} holds {value:?}, which is not a number")]
    NotNumeric {
        column: String,
        value: String
    },
    #[error("column {0:?} has no values to summarize")]
    Empty(String)
}


/// An exported table, held as text cells.
#[derive(Debug)]
pub(crate) struct Table {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>
}


impl Table {
    pub(crate) fn read<R: io::Read>(reader: R, format: ExportFormat) -> Result<Self, SummaryError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub(crate) fn open(path: &Path, format: ExportFormat) -> Result<Self, SummaryError> {
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::read(file, format)
    }

    /// Every cell of `name`, trimmed, in row order.
    pub(crate) fn column(&self, name: &str) -> Result<Vec<&str>, SummaryError> {
        let index = self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| SummaryError::UnknownColumn {
                column: name.to_string(),
                available: self.headers.iter().collect::<Vec<_>>().join(", ")
            })?;

        Ok(self.rows.iter().map(|row| row.get(index).unwrap_or_default().trim()).collect())
    }
}


/// How often each distinct value of a column occurs, most frequent first.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValueBar {
    column: String,
    /// Ties keep the order in which the values first appear.
    counts: Vec<(String, usize)>,
    total: usize
}


impl ValueBar {
    /// Empty cells are not counted.
    pub(crate) fn new(table: &Table, column: &str) -> Result<Self, SummaryError> {
        let mut first_seen = Vec::new();
        let mut counts = FxHashMap::<&str, usize>::default();
        for cell in table.column(column)?.into_iter().filter(|x| !x.is_empty()) {
            let count = counts.entry(cell).or_insert_with(|| {
                first_seen.push(cell);
                0
            });
            *count += 1;
        }
        if first_seen.is_empty() {
            return Err(SummaryError::Empty(column.to_string()));
        }

        let mut counts: Vec<(String, usize)> = first_seen
            .into_iter()
            .map(|value| (value.to_string(), counts[value]))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let total = counts.iter().map(|(_, count)| count).sum();

        Ok(Self { column: column.to_string(), counts, total })
    }

    #[cfg(test)]
    pub(crate) fn counts(&self) -> &[(String, usize)] {
        &self.counts
    }

    /// Each value's share of all counted cells. The shares sum to 1.
    pub(crate) fn shares(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.counts
            .iter()
            .map(|(value, count)| (value.as_str(), *count as f64 / self.total as f64))
    }
}


impl fmt::Display for ValueBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} values)", self.column, self.total)?;
        let label_width = self.counts.iter().map(|(value, _)| value.chars().count()).max().unwrap_or(0);
        let most = self.counts.first().map(|(_, count)| *count).unwrap_or(1);
        for ((value, count), (_, share)) in self.counts.iter().zip(self.shares()) {
            let bar = "#".repeat(count * BAR_WIDTH / most);
            writeln!(f, "{value:<label_width$} | {bar:<BAR_WIDTH$} {count} ({:.1}%)", share * 100.0)?;
        }
        Ok(())
    }
}


/// The numeric values of a column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValueHist {
    column: String,
    values: Vec<f64>
}


impl ValueHist {
    /// Empty cells are replaced with `fill`, or skipped when there is none.
    pub(crate) fn new(table: &Table, column: &str, fill: Option<f64>) -> Result<Self, SummaryError> {
        let mut values = Vec::new();
        for cell in table.column(column)? {
            if cell.is_empty() {
                values.extend(fill);
                continue;
            }
            let value = cell.parse::<f64>().map_err(|_| SummaryError::NotNumeric {
                column: column.to_string(),
                value: cell.to_string()
            })?;
            values.push(value);
        }
        if values.is_empty() {
            return Err(SummaryError::Empty(column.to_string()));
        }
        Ok(Self { column: column.to_string(), values })
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    /// Splits `[min, max]` into `bins` equal bins. Every bin but the last excludes
    /// its upper edge. When all values are equal the range becomes `[v - 0.5, v + 0.5]`.
    pub(crate) fn histogram(&self, bins: usize) -> Histogram {
        let bins = bins.max(1);
        let min = self.values.iter().copied().map(OrderedFloat).min().map_or(0.0, |x| x.0);
        let max = self.values.iter().copied().map(OrderedFloat).max().map_or(0.0, |x| x.0);
        let (low, high) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
        let width = (high - low) / bins as f64;

        let mut counts = vec![0usize; bins];
        for value in &self.values {
            let index = ((value - low) / width).floor() as usize;
            counts[index.min(bins - 1)] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| Bin {
                start: low + width * index as f64,
                end: if index + 1 == bins { high } else { low + width * (index + 1) as f64 },
                count
            })
            .collect();
        Histogram { column: self.column.clone(), bins }
    }
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bin {
    pub(crate) start: f64,
    pub(crate) end: f64,
    pub(crate) count: usize
}


#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Histogram {
    column: String,
    bins: Vec<Bin>
}


impl Histogram {
    #[cfg(test)]
    pub(crate) fn bins(&self) -> &[Bin] {
        &self.bins
    }
}


impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.bins.iter().map(|bin| bin.count).sum();
        writeln!(f, "{} ({} values)", self.column, total)?;
        let most = self.bins.iter().map(|bin| bin.count).max().unwrap_or(0).max(1);
        let labels: Vec<String> = self.bins
            .iter()
            .enumerate()
            .map(|(index, bin)| {
                let close = if index + 1 == self.bins.len() { ']' } else { ')' };
                format!("[{:.2}, {:.2}{close}", bin.start, bin.end)
            })
            .collect();
        let label_width = labels.iter().map(String::len).max().unwrap_or(0);

        for (label, bin) in labels.iter().zip(&self.bins) {
            let bar = "#".repeat(bin.count * BAR_WIDTH / most);
            writeln!(f, "{label:<label_width$} | {bar:<BAR_WIDTH$} {}", bin.count)?;
        }
        Ok(())
    }
}
