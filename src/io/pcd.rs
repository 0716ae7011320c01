use std::io::Read;
use std::path::Path;

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use super::open_file;
use crate::error::{Error, Result};
use crate::pointcloud::{PointCloud, ScalarField, ScalarValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Float,
    Signed,
    Unsigned,
}

#[derive(Debug, Clone)]
struct PcdField {
    name: String,
    size: usize,
    field_type: FieldType,
    count: usize,
}

impl PcdField {
    fn is_packed_color(&self) -> bool {
        (self.name == "rgb" || self.name == "rgba") && self.size == 4
    }
}

#[derive(Debug)]
struct PcdHeader {
    fields: Vec<PcdField>,
    points: usize,
    data: DataFormat,
    /// Byte offset of the first byte after the `DATA` line.
    data_offset: usize,
}

fn parse_header(filepath: &Path, raw: &[u8]) -> Result<PcdHeader> {
    let mut names = Vec::new();
    let mut sizes = Vec::new();
    let mut types = Vec::new();
    let mut counts = Vec::new();
    let mut width = None;
    let mut height = 1;
    let mut points = None;

    let parse_usize = |key: &str, value: &str| {
        value
            .parse::<usize>()
            .map_err(|err| Error::format(filepath, format!("invalid {key} value `{value}`: {err}")))
    };

    let mut offset = 0;
    loop {
        if offset >= raw.len() {
            return Err(Error::format(filepath, "missing DATA line"));
        }
        let end = raw[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|pos| offset + pos + 1)
            .unwrap_or(raw.len());
        let line = std::str::from_utf8(&raw[offset..end])
            .map_err(|_| Error::format(filepath, "header is not valid UTF-8"))?
            .trim();
        offset = end;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();
        let values: Vec<&str> = tokens.collect();
        match key {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => names = values.iter().map(|v| v.to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_usize("SIZE", *v))
                    .collect::<Result<Vec<_>>>()?
            }
            "TYPE" => {
                types = values
                    .iter()
                    .map(|v| match *v {
                        "F" => Ok(FieldType::Float),
                        "I" => Ok(FieldType::Signed),
                        "U" => Ok(FieldType::Unsigned),
                        other => Err(Error::format(filepath, format!("invalid TYPE `{other}`"))),
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            "COUNT" => {
                counts = values
                    .iter()
                    .map(|v| parse_usize("COUNT", *v))
                    .collect::<Result<Vec<_>>>()?
            }
            "WIDTH" => width = Some(parse_usize("WIDTH", values.first().copied().unwrap_or(""))?),
            "HEIGHT" => height = parse_usize("HEIGHT", values.first().copied().unwrap_or(""))?,
            "POINTS" => points = Some(parse_usize("POINTS", values.first().copied().unwrap_or(""))?),
            "DATA" => {
                let data = match values.first() {
                    Some(&"ascii") => DataFormat::Ascii,
                    Some(&"binary") => DataFormat::Binary,
                    other => {
                        return Err(Error::format(
                            filepath,
                            format!("unsupported DATA format {other:?}"),
                        ))
                    }
                };

                if names.is_empty() {
                    return Err(Error::format(filepath, "missing FIELDS line"));
                }
                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if sizes.len() != names.len()
                    || types.len() != names.len()
                    || counts.len() != names.len()
                {
                    return Err(Error::format(
                        filepath,
                        "FIELDS, SIZE, TYPE and COUNT have different lengths",
                    ));
                }

                let points = match (points, width) {
                    (Some(points), _) => points,
                    (None, Some(width)) => width.checked_mul(height).ok_or_else(|| {
                        Error::format(filepath, format!("WIDTH {width} x HEIGHT {height} overflows"))
                    })?,
                    (None, None) => {
                        return Err(Error::format(filepath, "missing POINTS/WIDTH header"))
                    }
                };
                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(types)
                    .zip(counts)
                    .map(|(((name, size), field_type), count)| PcdField {
                        name,
                        size,
                        field_type,
                        count,
                    })
                    .collect();

                return Ok(PcdHeader {
                    fields,
                    points,
                    data,
                    data_offset: offset,
                });
            }
            other => debug!(key = other, "ignoring PCD header key"),
        }
    }
}

/// Decoded values of one PCD field across all points.
enum Column {
    Float(Vec<f32>),
    Double(Vec<f64>),
    Int(Vec<i64>),
    /// `rgb`/`rgba` packed as 0x00RRGGBB in 4 bytes.
    Packed(Vec<u32>),
    /// Fields with COUNT > 1, like histograms.
    Skipped,
}

impl Column {
    fn for_field(filepath: &Path, field: &PcdField) -> Result<Self> {
        if field.count != 1 {
            warn!(field = %field.name, count = field.count, "skipping multi-valued PCD field");
            return Ok(Column::Skipped);
        }
        if field.is_packed_color() {
            return Ok(Column::Packed(Vec::new()));
        }
        match (field.field_type, field.size) {
            (FieldType::Float, 4) => Ok(Column::Float(Vec::new())),
            (FieldType::Float, 8) => Ok(Column::Double(Vec::new())),
            (FieldType::Signed | FieldType::Unsigned, 1 | 2 | 4 | 8) => {
                Ok(Column::Int(Vec::new()))
            }
            (field_type, size) => Err(Error::format(
                filepath,
                format!(
                    "field `{}` has unsupported type {field_type:?} of size {size}",
                    field.name
                ),
            )),
        }
    }

    fn push_ascii(&mut self, field: &PcdField, token: &str) -> Option<()> {
        match self {
            Column::Float(values) => values.push(token.parse().ok()?),
            Column::Double(values) => values.push(token.parse().ok()?),
            Column::Int(values) => values.push(token.parse().ok()?),
            Column::Packed(values) => values.push(match field.field_type {
                FieldType::Float => token.parse::<f32>().ok()?.to_bits(),
                _ => token.parse::<u32>().ok()?,
            }),
            Column::Skipped => {}
        }
        Some(())
    }

    fn push_binary(&mut self, field: &PcdField, bytes: &[u8]) -> Option<()> {
        let bytes = bytes.get(..field.size)?;
        match self {
            Column::Float(values) => values.push(f32::from_le_bytes(bytes.try_into().ok()?)),
            Column::Double(values) => values.push(f64::from_le_bytes(bytes.try_into().ok()?)),
            Column::Packed(values) => values.push(u32::from_le_bytes(bytes.try_into().ok()?)),
            Column::Int(values) => values.push(match (field.field_type, field.size) {
                (FieldType::Signed, 1) => i8::from_le_bytes(bytes.try_into().ok()?) as i64,
                (FieldType::Signed, 2) => i16::from_le_bytes(bytes.try_into().ok()?) as i64,
                (FieldType::Signed, 4) => i32::from_le_bytes(bytes.try_into().ok()?) as i64,
                (FieldType::Signed, _) => i64::from_le_bytes(bytes.try_into().ok()?),
                (_, 1) => bytes[0] as i64,
                (_, 2) => u16::from_le_bytes(bytes.try_into().ok()?) as i64,
                (_, 4) => u32::from_le_bytes(bytes.try_into().ok()?) as i64,
                (_, _) => u64::from_le_bytes(bytes.try_into().ok()?) as i64,
            }),
            Column::Skipped => {}
        }
        Some(())
    }

    fn to_f32(&self) -> Option<Vec<f32>> {
        match self {
            Column::Float(values) => Some(values.clone()),
            Column::Double(values) => Some(values.iter().map(|v| *v as f32).collect()),
            Column::Int(values) => Some(values.iter().map(|v| *v as f32).collect()),
            _ => None,
        }
    }

    fn into_scalar_values(self) -> Option<ScalarValues> {
        match self {
            Column::Float(values) => Some(ScalarValues::Float(Array1::from(values))),
            Column::Double(values) => Some(ScalarValues::Double(Array1::from(values))),
            Column::Int(values) => Some(ScalarValues::Int(Array1::from(values))),
            Column::Packed(values) => Some(ScalarValues::Int(
                values.into_iter().map(|v| v as i64).collect(),
            )),
            Column::Skipped => None,
        }
    }
}

fn decode_ascii(
    filepath: &Path,
    header: &PcdHeader,
    body: &[u8],
    columns: &mut [Column],
) -> Result<()> {
    let body = std::str::from_utf8(body)
        .map_err(|_| Error::format(filepath, "ascii data is not valid UTF-8"))?;
    let mut rows = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    for i in 0..header.points {
        let line = rows.next().ok_or_else(|| {
            Error::format(
                filepath,
                format!("expected {} points, found {i}", header.points),
            )
        })?;
        let mut tokens = line.split_whitespace();
        for (field, column) in header.fields.iter().zip(columns.iter_mut()) {
            let mut first = None;
            for _ in 0..field.count {
                let token = tokens.next().ok_or_else(|| {
                    Error::format(filepath, format!("point {i}: too few values in `{line}`"))
                })?;
                first.get_or_insert(token);
            }
            if let Some(token) = first {
                column.push_ascii(field, token).ok_or_else(|| {
                    Error::format(
                        filepath,
                        format!("point {i}: invalid value `{token}` for `{}`", field.name),
                    )
                })?;
            }
        }
    }
    Ok(())
}

fn decode_binary(
    filepath: &Path,
    header: &PcdHeader,
    body: &[u8],
    columns: &mut [Column],
) -> Result<()> {
    let stride = header
        .fields
        .iter()
        .try_fold(0usize, |acc, f| {
            f.size.checked_mul(f.count).and_then(|bytes| acc.checked_add(bytes))
        })
        .ok_or_else(|| Error::format(filepath, "binary point record size overflows"))?;
    if stride == 0 {
        return Err(Error::format(filepath, "binary point records have zero size"));
    }
    let expected = stride
        .checked_mul(header.points)
        .filter(|expected| *expected <= body.len())
        .ok_or_else(|| {
            Error::format(
                filepath,
                format!(
                    "binary data has {} bytes, too few for {} points of {stride} bytes",
                    body.len(),
                    header.points
                ),
            )
        })?;

    for point in body[..expected].chunks_exact(stride) {
        let mut offset = 0;
        for (field, column) in header.fields.iter().zip(columns.iter_mut()) {
            column
                .push_binary(field, &point[offset..])
                .ok_or_else(|| Error::format(filepath, format!("truncated `{}`", field.name)))?;
            offset += field.size * field.count;
        }
    }
    Ok(())
}

fn take_triplet(
    fields: &[PcdField],
    columns: &mut [Option<Column>],
    keys: [&str; 3],
) -> Option<Vec<Vec<f32>>> {
    let indices: Vec<usize> = keys
        .iter()
        .map(|key| fields.iter().position(|f| f.name == *key))
        .collect::<Option<_>>()?;
    let values = indices
        .iter()
        .map(|i| columns[*i].as_ref().and_then(Column::to_f32))
        .collect::<Option<Vec<_>>>()?;
    indices.iter().for_each(|i| columns[*i] = None);
    Some(values)
}

fn interleave(columns: Vec<Vec<f32>>, len: usize) -> Array2<f32> {
    Array2::from_shape_fn((len, 3), |(i, c)| columns[c][i])
}

/// Reads a PCD (Point Cloud Data) file in `ascii` or `binary` layout.
///
/// `x`, `y`, `z` are required; `normal_x`, `normal_y`, `normal_z` become
/// normals and a packed `rgb`/`rgba` field becomes colors. Other single
/// valued fields are kept as scalar fields.
pub fn read_pcd<P: AsRef<Path>>(filepath: P) -> Result<PointCloud> {
    let filepath = filepath.as_ref();
    let mut raw = Vec::new();
    open_file(filepath)?.read_to_end(&mut raw)?;

    let header = parse_header(filepath, &raw)?;
    debug!(
        fields = ?header.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        points = header.points,
        data = ?header.data,
        "parsed PCD header"
    );

    let mut columns = header
        .fields
        .iter()
        .map(|field| Column::for_field(filepath, field))
        .collect::<Result<Vec<_>>>()?;

    let body = &raw[header.data_offset..];
    match header.data {
        DataFormat::Ascii => decode_ascii(filepath, &header, body, &mut columns)?,
        DataFormat::Binary => decode_binary(filepath, &header, body, &mut columns)?,
    }

    let mut columns: Vec<Option<Column>> = columns.into_iter().map(Some).collect();
    let points = take_triplet(&header.fields, &mut columns, ["x", "y", "z"])
        .ok_or_else(|| Error::format(filepath, "fields must include `x`, `y` and `z`"))?;
    let mut pcl = PointCloud::from_points(interleave(points, header.points));

    if let Some(normals) =
        take_triplet(&header.fields, &mut columns, ["normal_x", "normal_y", "normal_z"])
    {
        pcl.normals = Some(interleave(normals, header.points));
    }

    if let Some(index) = header.fields.iter().position(PcdField::is_packed_color) {
        if let Some(Column::Packed(packed)) = columns[index].take() {
            pcl.colors = Some(Array2::from_shape_fn((header.points, 3), |(i, c)| {
                (packed[i] >> (16 - 8 * c)) as u8
            }));
        }
    }

    for (field, column) in header.fields.iter().zip(columns) {
        if let Some(values) = column.and_then(Column::into_scalar_values) {
            pcl.scalars.push(ScalarField::new(field.name.clone(), values));
        }
    }

    Ok(pcl)
}
