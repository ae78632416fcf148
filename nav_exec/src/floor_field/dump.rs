//! # Grid dump
//!
//! CSV export of a domain's grid and floor fields for offline visualisation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io;

use building_if::DoorUid;
use serde::Serialize;

use super::{CellType, DomainFields, FloorFieldError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One row of the dump, a single cell of the field towards one door.
#[derive(Debug, Clone, Serialize)]
pub struct DumpRow {
    pub target: DoorUid,
    pub x_m: f64,
    pub y_m: f64,
    pub cell_type: CellType,
    pub wall_distance_m: f64,
    pub cost: f64,
    pub dir_x: f64,
    pub dir_y: f64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(crate) fn write_rows<W: io::Write>(
    fields: &DomainFields,
    targets: &[DoorUid],
    writer: W,
) -> Result<usize, FloorFieldError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut num_rows = 0;

    for target in targets {
        let field = fields
            .fields
            .get(target)
            .ok_or(FloorFieldError::NotFound {
                domain: fields.grid.domain,
                target: *target,
            })?;

        for (cell, cell_type) in fields.grid.cells.indexed_iter() {
            let position = fields.grid.grid.cell_position(cell);
            let direction = field.direction[cell];

            csv_writer.serialize(DumpRow {
                target: *target,
                x_m: position.x,
                y_m: position.y,
                cell_type: *cell_type,
                wall_distance_m: fields.wall_distance[cell],
                cost: field.cost[cell],
                dir_x: direction.x,
                dir_y: direction.y,
            })?;
            num_rows += 1;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| FloorFieldError::DumpFailed(e.into()))?;

    Ok(num_rows)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use crate::{
        fixtures,
        floor_field::{DomainId, FloorFieldError, FloorFieldParams, FloorFieldRouter},
    };

    #[test]
    fn test_write_dump() -> Result<(), FloorFieldError> {
        let building = fixtures::single_room(4.0, 2.0);
        let router = FloorFieldRouter::new(
            &building,
            FloorFieldParams {
                cell_size_m: 0.5,
                ..Default::default()
            },
        )?;
        let domain = DomainId::SubRoom(fixtures::SINGLE_SUBROOM);

        let mut buf = Vec::new();
        let rows = router.write_dump(domain, &[fixtures::SINGLE_EXIT], &mut buf)?;

        // 4 x 2 m at 0.5 m, plus the ring of spare cells
        assert_eq!(rows, 11 * 7);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("target,x_m,y_m,cell_type,wall_distance_m,cost,dir_x,dir_y")
        );
        assert_eq!(lines.count(), rows);

        assert!(matches!(
            router.write_dump(domain, &[42], Vec::new()),
            Err(FloorFieldError::NotFound { target: 42, .. })
        ));

        Ok(())
    }
}
