use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::open_file;
use crate::error::{Error, Result};
use crate::pointcloud::PointCloud;

struct TextParserContext {
    buf_reader: BufReader<File>,
    filepath: String,
    line_count: usize,
}

impl TextParserContext {
    /// Reads the next line that is neither blank nor a `#` comment, and
    /// increases the line counter. It already trim the string.
    fn read_line(&mut self) -> Result<String> {
        loop {
            let mut line = String::new();
            let read = self.buf_reader.read_line(&mut line)?;
            self.line_count += 1;
            if read == 0 {
                return Err(self.gen_error("unexpected end of file".to_string()));
            }

            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                return Ok(line.to_string());
            }
        }
    }

    /// Formats an error message by putting the file name, the current line and the supplied message.
    ///
    /// # Arguments
    ///
    /// * `message` - An error message.
    fn gen_error(&self, message: String) -> Error {
        Error::format(&self.filepath, format!("{}: {}", self.line_count, message))
    }
}

/// Reads the vertices of an OFF (Object File Format) mesh as a point cloud.
///
/// `COFF` files also give per vertex colors. Faces are not read.
pub fn read_off<P: AsRef<Path>>(filepath: P) -> Result<PointCloud> {
    let filepath = filepath.as_ref();
    let file = open_file(filepath)?;

    let mut parser_context = TextParserContext {
        buf_reader: BufReader::new(file),
        filepath: filepath.display().to_string(),
        line_count: 0,
    };

    let header = parser_context.read_line()?;
    let with_colors = match header.as_str() {
        "OFF" => false,
        "COFF" => true,
        _ => {
            return Err(parser_context.gen_error(format!(
                "file header does not start with 'OFF', got '{header}' instead"
            )))
        }
    };

    let dims = parser_context.read_line()?;
    let num_verts = match dims
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Vec<_>>()[..]
    {
        [Ok(v0), Ok(_), Ok(_)] => v0,
        _ => {
            return Err(parser_context.gen_error(format!("Invalid size formats. Got `{dims}`")))
        }
    };

    let mut points = Vec::new();
    let mut colors = Vec::new();
    for _ in 0..num_verts {
        let line = parser_context.read_line()?;
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let xyz = tokens
            .iter()
            .take(3)
            .map(|x| x.parse::<f32>())
            .collect::<Vec<_>>();
        let rgb = parse_color(tokens.get(3..6).unwrap_or(&[]));

        match (with_colors, &xyz[..], tokens.len(), rgb) {
            (false, [Ok(x), Ok(y), Ok(z)], 3, _) => points.extend([*x, *y, *z]),
            (true, [Ok(x), Ok(y), Ok(z)], _, Some(rgb)) => {
                points.extend([*x, *y, *z]);
                colors.extend(rgb);
            }
            _ => {
                return Err(parser_context.gen_error(format!("Invalid vertex. Got `{line}`")));
            }
        }
    }

    let pcl = PointCloud::from_points(
        Array2::from_shape_vec((num_verts, 3), points)
            .map_err(|err| parser_context.gen_error(err.to_string()))?,
    );
    Ok(if with_colors {
        pcl.with_colors(
            Array2::from_shape_vec((num_verts, 3), colors)
                .map_err(|err| parser_context.gen_error(err.to_string()))?,
        )
    } else {
        pcl
    })
}

/// COFF colors are either integers in [0, 255] or floats in [0, 1]. A
/// vertex whose three components are not all integers is read as floats.
fn parse_color(tokens: &[&str]) -> Option<[u8; 3]> {
    if tokens.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    if tokens
        .iter()
        .zip(rgb.iter_mut())
        .all(|(token, c)| token.parse().map(|v| *c = v).is_ok())
    {
        return Some(rgb);
    }
    for (token, c) in tokens.iter().zip(rgb.iter_mut()) {
        let value = token
            .parse::<f32>()
            .ok()
            .filter(|value| (0.0..=1.0).contains(value))?;
        *c = (value * 255.0).round() as u8;
    }
    Some(rgb)
}
