use super::model::{Channel, ChannelSpec, RawTable};
use crate::error::Result;

/// Derive one channel from `table`.
///
/// All columns named by `spec` are range-checked before any row is touched.
/// Delta channels hold `effect - cause` per row; value channels copy the
/// effect column.  The result always has one value per table row.
pub fn extract(table: &RawTable, spec: &ChannelSpec) -> Result<Channel> {
    spec.validate(table.columns())?;

    let values: Vec<f64> = match spec.cause {
        Some(cause) => table
            .rows()
            .iter()
            .map(|row| row[spec.effect] - row[cause])
            .collect(),
        None => table.rows().iter().map(|row| row[spec.effect]).collect(),
    };

    log::info!("Derived channel '{}' ({} samples)", spec.name, values.len());
    Ok(Channel {
        name: spec.name.clone(),
        values,
    })
}

/// Derive every channel in `specs`, failing on the first invalid spec.
pub fn extract_all(table: &RawTable, specs: &[ChannelSpec]) -> Result<Vec<Channel>> {
    specs.iter().map(|spec| extract(table, spec)).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::AnalysisError;

    fn scenario_table() -> RawTable {
        RawTable::from_rows(vec![
            vec![0.0, 10.0, 12.0],
            vec![0.0, 20.0, 19.0],
            vec![1.0, 5.0, 9.0],
        ])
        .unwrap()
    }

    #[test]
    fn delta_channel() {
        let channel = extract(&scenario_table(), &ChannelSpec::delta("lat", 1, 2)).unwrap();
        assert_eq!(channel.name, "lat");
        assert_eq!(channel.values, vec![2.0, -1.0, 4.0]);
    }

    #[test]
    fn value_channel_copies_column() {
        let channel = extract(&scenario_table(), &ChannelSpec::value("raw", 1)).unwrap();
        assert_eq!(channel.values, vec![10.0, 20.0, 5.0]);
    }

    #[test]
    fn two_channels_from_one_table() {
        let table = RawTable::from_rows(vec![
            vec![0.0, 100.0, 103.0, 105.0, 110.0],
            vec![1.0, 200.0, 201.0, 204.0, 207.0],
        ])
        .unwrap();
        let specs = [
            ChannelSpec::delta("client", 1, 4),
            ChannelSpec::delta("server", 2, 3),
        ];
        let channels = extract_all(&table, &specs).unwrap();
        assert_eq!(channels[0].values, vec![10.0, 7.0]);
        assert_eq!(channels[1].values, vec![2.0, 3.0]);
    }

    #[test]
    fn out_of_range_column_rejected() {
        let err = extract(&scenario_table(), &ChannelSpec::delta("bad", 1, 3)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidColumnSpec { column: 3, columns: 3, .. }
        ));
    }

    fn table_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
        (1usize..6).prop_flat_map(|cols| {
            prop::collection::vec(prop::collection::vec(-1e6f64..1e6, cols), 1..64)
        })
    }

    proptest! {
        #[test]
        fn channel_length_matches_rows(rows in table_strategy(), a in 0usize..6, b in 0usize..6) {
            let table = RawTable::from_rows(rows).unwrap();
            let cols = table.columns();
            let spec = ChannelSpec::delta("p", a % cols, b % cols);
            let channel = extract(&table, &spec).unwrap();
            prop_assert_eq!(channel.len(), table.len());
        }
    }
}
