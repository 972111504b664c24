use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;

/// Outcome of one grid point: the emission configuration and the energy the event deposited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanRecord {
    pub theta_deg: f64,
    pub phi_deg: f64,
    pub energy_gev: f64,
    pub deposited_kev: f64,
}

impl fmt::Display for ScanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "theta = {:.1} deg, phi = {:.1} deg, energy = {:.3} GeV, deposited = {:.3} keV",
            self.theta_deg, self.phi_deg, self.energy_gev, self.deposited_kev
        )
    }
}

/// Records of a scan in traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    records: Vec<ScanRecord>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ScanRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_deposited_kev(&self) -> f64 {
        self.records.iter().map(|r| r.deposited_kev).sum()
    }

    /// The grid point with the largest deposit; ties resolve to the earliest point.
    pub fn max_deposit(&self) -> Option<&ScanRecord> {
        self.records.iter().fold(None, |best, r| match best {
            Some(b) if b.deposited_kev >= r.deposited_kev => Some(b),
            _ => Some(r),
        })
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl<'a> IntoIterator for &'a ScanResult {
    type Item = &'a ScanRecord;
    type IntoIter = std::slice::Iter<'a, ScanRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(theta: f64, phi: f64, deposited: f64) -> ScanRecord {
        ScanRecord {
            theta_deg: theta,
            phi_deg: phi,
            energy_gev: 25.0,
            deposited_kev: deposited,
        }
    }

    #[test]
    fn display_contains_all_fields() {
        let line = record(90.0, 0.0, 1234.5).to_string();
        assert_eq!(
            line,
            "theta = 90.0 deg, phi = 0.0 deg, energy = 25.000 GeV, deposited = 1234.500 keV"
        );
    }

    #[test]
    fn max_deposit_prefers_earliest_on_ties() {
        let mut result = ScanResult::new();
        result.push(record(0.0, 0.0, 5.0));
        result.push(record(30.0, 0.0, 9.0));
        result.push(record(60.0, 0.0, 9.0));
        let best = result.max_deposit().unwrap();
        assert_eq!(best.theta_deg, 30.0);
        assert_eq!(result.total_deposited_kev(), 23.0);
    }

    #[test]
    fn empty_result_has_no_max() {
        assert!(ScanResult::new().max_deposit().is_none());
    }

    #[test]
    fn write_csv_emits_header_and_rows_in_order() {
        let mut result = ScanResult::new();
        result.push(record(0.0, 0.0, 1.5));
        result.push(record(0.0, 30.0, 2.5));
        let mut buffer = Vec::new();
        result.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "theta_deg,phi_deg,energy_gev,deposited_kev");
        assert_eq!(lines[1], "0.0,0.0,25.0,1.5");
        assert_eq!(lines[2], "0.0,30.0,25.0,2.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn save_csv_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        let mut result = ScanResult::new();
        result.push(record(90.0, 0.0, 0.0));
        result.save_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("theta_deg,phi_deg,energy_gev,deposited_kev"));
    }
}
