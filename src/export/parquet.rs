//! Parquet serialization of materialized query results.
//!
//! One Arrow column per result column, typed from its values. A column of
//! one kind reloads unchanged. Mixed columns are lossy: integers mixed with
//! floats are widened to Float64 (so `Int(1)` reloads as `Float(1.0)`), and
//! other scalar mixes are stored as Utf8 text. Binary values never mix and
//! such a column is rejected. The source column type is kept in the field
//! metadata so a reload reproduces the original column info.

use crate::db::{ColumnInfo, QueryResult, Row, Value};
use crate::error::{ExtractError, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Field metadata key holding the source column type.
const SOURCE_TYPE_KEY: &str = "source_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
    Binary,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Int(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::String(_) => Some(Self::Text),
            Value::Bytes(_) => Some(Self::Binary),
        }
    }

    fn widen(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Some(Self::Float),
            (Self::Binary, _) | (_, Self::Binary) => None,
            _ => Some(Self::Text),
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Bool => DataType::Boolean,
            Self::Text => DataType::Utf8,
            Self::Binary => DataType::Binary,
        }
    }
}

/// Picks the Arrow representation for one column. All-null columns are text.
fn infer_kind<'a>(name: &str, values: impl Iterator<Item = &'a Value>) -> Result<ColumnKind> {
    let mut kind: Option<ColumnKind> = None;
    for next in values.filter_map(ColumnKind::of) {
        kind = match kind {
            None => Some(next),
            Some(current) => Some(current.widen(next).ok_or_else(|| {
                ExtractError::export(format!(
                    "column '{name}' mixes binary and non-binary values"
                ))
            })?),
        };
    }
    Ok(kind.unwrap_or(ColumnKind::Text))
}

fn build_array<'a>(kind: ColumnKind, values: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match kind {
        ColumnKind::Int => Arc::new(
            values
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        ColumnKind::Float => Arc::new(
            values
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    Value::Int(i) => Some(*i as f64),
                    _ => None,
                })
                .collect::<Float64Array>(),
        ),
        ColumnKind::Bool => Arc::new(
            values
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<BooleanArray>(),
        ),
        ColumnKind::Binary => {
            let bytes: Vec<Option<&[u8]>> = values
                .map(|v| match v {
                    Value::Bytes(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect();
            Arc::new(BinaryArray::from_opt_vec(bytes))
        }
        ColumnKind::Text => Arc::new(
            values
                .map(|v| match v {
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Int(i) => Some(i.to_string()),
                    Value::Float(f) => Some(f.to_string()),
                    Value::String(s) => Some(s.clone()),
                    Value::Null | Value::Bytes(_) => None,
                })
                .collect::<StringArray>(),
        ),
    }
}

/// Converts a result set to a single Arrow record batch.
pub fn to_record_batch(result: &QueryResult) -> Result<RecordBatch> {
    if result.columns.is_empty() {
        return Err(ExtractError::export(
            "result has no columns; nothing to serialize",
        ));
    }

    let mut fields = Vec::with_capacity(result.columns.len());
    let mut arrays = Vec::with_capacity(result.columns.len());

    for (index, column) in result.columns.iter().enumerate() {
        let kind = infer_kind(&column.name, result.column_values(index))?;
        let metadata = HashMap::from([(SOURCE_TYPE_KEY.to_string(), column.data_type.clone())]);
        fields.push(Field::new(&column.name, kind.data_type(), true).with_metadata(metadata));
        arrays.push(build_array(kind, result.column_values(index)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Writes `result` as a Snappy-compressed Parquet file, creating parent
/// directories as needed. Returns the number of rows written.
pub fn write_parquet(result: &QueryResult, path: &Path) -> Result<usize> {
    let batch = to_record_batch(result)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    info!(
        "Wrote {} rows x {} columns to {}",
        batch.num_rows(),
        batch.num_columns(),
        path.display()
    );
    Ok(batch.num_rows())
}

/// Reloads a Parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<QueryResult> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let columns: Vec<ColumnInfo> = builder
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let data_type = field
                .metadata()
                .get(SOURCE_TYPE_KEY)
                .cloned()
                .unwrap_or_else(|| field.data_type().to_string());
            ColumnInfo::new(field.name(), data_type)
        })
        .collect();

    let mut rows: Vec<Row> = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        let decoded = batch
            .columns()
            .iter()
            .map(|array| array_values(array.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        for row_index in 0..batch.num_rows() {
            rows.push(decoded.iter().map(|col| col[row_index].clone()).collect());
        }
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(QueryResult::with_data(columns, rows))
}

fn array_values(array: &dyn Array) -> Result<Vec<Value>> {
    let values: Vec<Value> = match array.data_type() {
        DataType::Int64 => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(Value::from)
            .collect(),
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(Value::from)
            .collect(),
        DataType::Boolean => array.as_boolean().iter().map(Value::from).collect(),
        DataType::Utf8 => array.as_string::<i32>().iter().map(Value::from).collect(),
        DataType::Binary => array
            .as_binary::<i32>()
            .iter()
            .map(|b| b.map_or(Value::Null, |b| Value::Bytes(b.to_vec())))
            .collect(),
        other => {
            return Err(ExtractError::export(format!(
                "unsupported column type {other}"
            )))
        }
    };
    Ok(values)
}
