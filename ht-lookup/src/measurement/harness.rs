/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

use super::data_point::DataPoint;
use crate::error::Result;
use error_chain::ensure;
use std::path::Path;

/// Writes the measurements as CSV with a header row.
pub fn write_measurements(out_file_name: &Path, measurements: &[DataPoint]) -> Result<()> {
    let csv_file = std::fs::File::create(out_file_name)?;
    let mut csv = csv::Writer::from_writer(csv_file);
    ensure!(
        measurements
            .iter()
            .try_for_each(|row| csv.serialize(row))
            .is_ok(),
        "Couldn't write serialized measurements"
    );
    csv.flush()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error;
    use std::fs;

    #[test]
    fn csv_has_header_and_row() -> std::result::Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("measurements.csv");

        let dp = DataPoint {
            hostname: "host".to_string(),
            threads: Some(4),
            matches: Some(42),
            ..DataPoint::default()
        };
        write_measurements(&path, &[dp])?;

        let contents = fs::read_to_string(&path)?;
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some(concat!(
                "hostname,cpu_codename,threads,hash_size,inner_size,outer_size,",
                "lookups,collisions,matches,build_ns,probe_ns,malloc_ns"
            ))
        );
        assert_eq!(lines.next(), Some("host,,4,,,,,,42,,,"));
        assert_eq!(lines.next(), None);
        Ok(())
    }
}
