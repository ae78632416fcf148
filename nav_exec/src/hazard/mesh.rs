//! # Hazard mesh
//!
//! A rectangular mesh of knots holding one hazard quantity over one horizontal slice of the
//! building at one point in time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io;

use nalgebra::Point2;
use ndarray::Array2;

use super::HazardError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HazardMesh {
    /// Position of knot (0, 0)
    pub origin_m: Point2<f64>,

    /// Distance between neighbouring knots
    pub cell_size_m: f64,

    /// Knot values, indexed by `(row, column)`, rows running along y
    pub values: Array2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HazardMesh {
    pub fn new(
        origin_m: Point2<f64>,
        cell_size_m: f64,
        values: Array2<f64>,
    ) -> Result<Self, HazardError> {
        if !(cell_size_m > 0.0) || !cell_size_m.is_finite() {
            return Err(HazardError::BadMesh(format!(
                "cell size must be positive, found {}",
                cell_size_m
            )));
        }
        if values.is_empty() {
            return Err(HazardError::BadMesh("mesh has no knots".into()));
        }

        Ok(Self {
            origin_m,
            cell_size_m,
            values,
        })
    }

    /// Read a mesh from CSV.
    ///
    /// The first record holds `cell_size,x_min,x_max,y_min,y_max`, every following record is one
    /// row of knot values starting at `y_min`. Values which don't parse as numbers are an error,
    /// but `nan` and `inf` are accepted and read as such.
    pub fn from_csv_reader<R: io::Read>(reader: R) -> Result<Self, HazardError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = csv_reader.records();

        let header = records
            .next()
            .ok_or_else(|| HazardError::BadMesh("missing header".into()))??;
        let header = parse_record(&header)?;
        if header.len() != 5 {
            return Err(HazardError::BadMesh(format!(
                "expected 5 header fields, found {}",
                header.len()
            )));
        }
        let (cell_size_m, x_min, x_max, y_min, y_max) =
            (header[0], header[1], header[2], header[3], header[4]);

        if !(cell_size_m > 0.0) || x_max < x_min || y_max < y_min {
            return Err(HazardError::BadMesh(format!(
                "invalid extent {:?}",
                header
            )));
        }

        let num_cols = ((x_max - x_min) / cell_size_m).round() as usize + 1;
        let num_rows = ((y_max - y_min) / cell_size_m).round() as usize + 1;

        let mut values = Vec::with_capacity(num_rows * num_cols);
        let mut rows_read = 0;
        for record in records {
            let row = parse_record(&record?)?;
            if row.len() != num_cols {
                return Err(HazardError::BadMesh(format!(
                    "row {} has {} values, expected {}",
                    rows_read,
                    row.len(),
                    num_cols
                )));
            }
            values.extend(row);
            rows_read += 1;
        }

        if rows_read != num_rows {
            return Err(HazardError::BadMesh(format!(
                "found {} rows, expected {}",
                rows_read, num_rows
            )));
        }

        let values = Array2::from_shape_vec((num_rows, num_cols), values)
            .map_err(|e| HazardError::BadMesh(e.to_string()))?;

        Self::new(Point2::new(x_min, y_min), cell_size_m, values)
    }

    /// Value of the knot nearest to the position. Positions beyond the mesh read the nearest
    /// knot on its border.
    pub fn value_at(&self, position: &Point2<f64>) -> f64 {
        let (num_rows, num_cols) = self.values.dim();

        let index = |v: f64, n: usize| {
            let i = (v / self.cell_size_m).round();
            if i.is_nan() || i <= 0.0 {
                0
            } else {
                (i as usize).min(n - 1)
            }
        };

        let col = index(position.x - self.origin_m.x, num_cols);
        let row = index(position.y - self.origin_m.y, num_rows);

        self.values[(row, col)]
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn parse_record(record: &csv::StringRecord) -> Result<Vec<f64>, HazardError> {
    record
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| HazardError::BadMesh(format!("could not parse {:?}", field)))
        })
        .collect()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const MESH: &str = "\
0.5, 0.0, 1.0, 2.0, 2.5
0.0, 0.1, 0.2
1.0, nan, 3.0
";

    #[test]
    fn test_mesh_csv() {
        let mesh = HazardMesh::from_csv_reader(MESH.as_bytes()).unwrap();

        assert_eq!(mesh.values.dim(), (2, 3));
        assert_eq!(mesh.origin_m, Point2::new(0.0, 2.0));

        assert_eq!(mesh.value_at(&Point2::new(0.0, 2.0)), 0.0);
        assert_eq!(mesh.value_at(&Point2::new(0.6, 2.1)), 0.1);
        assert_eq!(mesh.value_at(&Point2::new(1.0, 2.5)), 3.0);
        assert!(mesh.value_at(&Point2::new(0.5, 2.5)).is_nan());

        // Clamped onto the border
        assert_eq!(mesh.value_at(&Point2::new(-10.0, 2.5)), 1.0);
        assert_eq!(mesh.value_at(&Point2::new(10.0, 0.0)), 0.2);
    }

    #[test]
    fn test_bad_mesh() {
        let short_row = "0.5, 0.0, 1.0, 2.0, 2.5\n0.0, 0.1\n1.0, 2.0, 3.0\n";
        assert!(matches!(
            HazardMesh::from_csv_reader(short_row.as_bytes()),
            Err(HazardError::BadMesh(_))
        ));

        let missing_row = "0.5, 0.0, 1.0, 2.0, 2.5\n0.0, 0.1, 0.2\n";
        assert!(matches!(
            HazardMesh::from_csv_reader(missing_row.as_bytes()),
            Err(HazardError::BadMesh(_))
        ));

        assert!(matches!(
            HazardMesh::from_csv_reader("".as_bytes()),
            Err(HazardError::BadMesh(_))
        ));
    }
}
