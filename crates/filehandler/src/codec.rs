//! Payload codecs
//!
//! The set of codecs is closed: one per [`PayloadKind`], picked explicitly by
//! the caller through the type parameter of `FileHandler::read`/`write`.

use std::io::Cursor;
use std::marker::PhantomData;

use arrow::compute::concat_batches;
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use store_core::{Error, PayloadKind, Result};
use tracing::info;

/// Column dropped from frames on read
pub const INDEX_COLUMN: &str = "index";

mod sealed {
    pub trait Sealed {}
}

/// Encode/decode capability bound to one payload kind
pub trait Codec: sealed::Sealed {
    type Value;

    const KIND: PayloadKind;

    fn encode(value: &Self::Value) -> Result<Bytes>;

    fn decode(bytes: Bytes) -> Result<Self::Value>;
}

/// Columnar frames stored as Arrow IPC files (Feather v2)
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

/// Arbitrary serde values stored with bincode
pub struct ObjectCodec<T>(PhantomData<T>);

/// Serde values stored as JSON
pub struct JsonCodec<T>(PhantomData<T>);

/// UTF-8 text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl sealed::Sealed for FrameCodec {}
impl<T> sealed::Sealed for ObjectCodec<T> {}
impl<T> sealed::Sealed for JsonCodec<T> {}
impl sealed::Sealed for TextCodec {}

fn arrow_error(e: ArrowError) -> Error {
    Error::Serialization(e.to_string())
}

impl Codec for FrameCodec {
    type Value = RecordBatch;

    const KIND: PayloadKind = PayloadKind::TabularFrame;

    fn encode(value: &RecordBatch) -> Result<Bytes> {
        let mut buffer = Vec::new();
        {
            let mut writer = FileWriter::try_new(&mut buffer, &value.schema()).map_err(arrow_error)?;
            writer.write(value).map_err(arrow_error)?;
            writer.finish().map_err(arrow_error)?;
        }
        Ok(Bytes::from(buffer))
    }

    fn decode(bytes: Bytes) -> Result<RecordBatch> {
        let reader = FileReader::try_new(Cursor::new(bytes), None).map_err(arrow_error)?;
        let schema = reader.schema();
        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(arrow_error)?;
        concat_batches(&schema, &batches).map_err(arrow_error)
    }
}

impl<T> Codec for ObjectCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    const KIND: PayloadKind = PayloadKind::GenericObject;

    fn encode(value: &T) -> Result<Bytes> {
        bincode::serialize(value)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    fn decode(bytes: Bytes) -> Result<T> {
        bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    const KIND: PayloadKind = PayloadKind::Json;

    fn encode(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(bytes: Bytes) -> Result<T> {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Codec for TextCodec {
    type Value = String;

    const KIND: PayloadKind = PayloadKind::Text;

    fn encode(value: &String) -> Result<Bytes> {
        Ok(Bytes::from(value.clone()))
    }

    fn decode(bytes: Bytes) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Options for reading a frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReadOptions {
    /// Columns to keep, in this order; all columns when `None`
    pub columns: Option<Vec<String>>,

    /// Fail when the frame ends up with more columns than this
    pub col_limit: Option<usize>,
}

impl FrameReadOptions {
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn col_limit(mut self, limit: usize) -> Self {
        self.col_limit = Some(limit);
        self
    }
}

/// Apply projection, drop the `index` column, then enforce the column limit
pub fn shape_frame(frame: RecordBatch, options: &FrameReadOptions, filename: &str) -> Result<RecordBatch> {
    let schema = frame.schema();

    let mut indices = match &options.columns {
        Some(columns) => columns
            .iter()
            .map(|column| {
                schema.index_of(column).map_err(|_| Error::UnknownColumn {
                    column: column.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => (0..schema.fields().len()).collect(),
    };

    let before = indices.len();
    indices.retain(|&idx| schema.field(idx).name() != INDEX_COLUMN);
    if indices.len() != before {
        info!(
            %filename,
            "Dropped column index on import. If this is unintentional rename the column in the file."
        );
    }

    let frame = frame.project(&indices).map_err(arrow_error)?;

    if let Some(limit) = options.col_limit {
        if frame.num_columns() > limit {
            return Err(Error::ColumnLimitExceeded {
                limit,
                actual: frame.num_columns(),
            });
        }
    }

    Ok(frame)
}
