//! In-memory `ReportingStore` for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;

use super::{
    InsertReport, LeadershipEntry, ProgramRecord, ReportMetadata, ReportingPeriod, ReportingStore,
    Sector,
};

#[derive(Default)]
pub struct MemoryStore {
    pub periods: Vec<ReportingPeriod>,
    pub sectors: Vec<Sector>,
    pub leadership: HashMap<i32, Vec<LeadershipEntry>>,
    pub programs: HashMap<(i32, i32), Vec<ProgramRecord>>,
    /// Sectors whose program query fails.
    pub failing_sectors: HashSet<i32>,
    pub fail_inserts: bool,
    pub reports: Mutex<Vec<ReportMetadata>>,
    pub table_created: Mutex<bool>,
    pub ensure_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_period(quarter: i32, year: i32) -> Self {
        Self {
            periods: vec![ReportingPeriod {
                id: 1,
                quarter,
                year,
                start_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(year, 3, 31).unwrap(),
            }],
            ..Default::default()
        }
    }

    pub fn add_sector(&mut self, id: i32, name: &str) {
        self.sectors.push(Sector {
            id,
            name: name.to_string(),
        });
    }

    pub fn add_program(&mut self, sector_id: i32, period_id: i32, program: ProgramRecord) {
        self.programs
            .entry((sector_id, period_id))
            .or_default()
            .push(program);
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

pub fn program(id: i32, name: &str, status: &str, blob: Option<&str>) -> ProgramRecord {
    ProgramRecord {
        id,
        name: name.to_string(),
        status: status.to_string(),
        content_blob: blob.map(str::to_string),
        agency_name: "Department of Testing".to_string(),
    }
}

#[async_trait::async_trait]
impl ReportingStore for MemoryStore {
    async fn find_period(&self, id: i32) -> Result<Option<ReportingPeriod>, sqlx::Error> {
        Ok(self.periods.iter().find(|p| p.id == id).cloned())
    }

    async fn list_sectors(&self) -> Result<Vec<Sector>, sqlx::Error> {
        Ok(self.sectors.clone())
    }

    async fn find_sector(&self, id: i32) -> Result<Option<Sector>, sqlx::Error> {
        Ok(self.sectors.iter().find(|s| s.id == id).cloned())
    }

    async fn sector_leadership(
        &self,
        sector_id: i32,
        limit: i64,
    ) -> Result<Vec<LeadershipEntry>, sqlx::Error> {
        let mut entries = self.leadership.get(&sector_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.position.cmp(&a.position));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn finalized_programs(
        &self,
        sector_id: i32,
        period_id: i32,
    ) -> Result<Vec<ProgramRecord>, sqlx::Error> {
        if self.failing_sectors.contains(&sector_id) {
            return Err(sqlx::Error::Protocol(format!(
                "simulated failure for sector {sector_id}"
            )));
        }
        Ok(self
            .programs
            .get(&(sector_id, period_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn ensure_reports_table(&self) -> Result<(), sqlx::Error> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let mut created = self.table_created.lock().unwrap();
        *created = true;
        Ok(())
    }

    async fn insert_report(
        &self,
        params: &InsertReport<'_>,
    ) -> Result<ReportMetadata, sqlx::Error> {
        if self.fail_inserts {
            return Err(sqlx::Error::Protocol("simulated insert failure".into()));
        }
        if !*self.table_created.lock().unwrap() {
            return Err(sqlx::Error::Protocol("relation \"reports\" does not exist".into()));
        }
        let mut reports = self.reports.lock().unwrap();
        let row = ReportMetadata {
            report_id: reports.len() as i64 + 1,
            period_id: params.period_id,
            report_name: params.report_name.to_string(),
            description: Some(params.description.to_string()),
            pptx_path: params.pptx_path.to_string(),
            pdf_path: None,
            generated_by: params.generated_by,
            generated_at: params.generated_at,
            is_public: false,
        };
        reports.push(row.clone());
        Ok(row)
    }

    async fn get_report(&self, id: i64) -> Result<Option<ReportMetadata>, sqlx::Error> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.report_id == id)
            .cloned())
    }

    async fn list_reports(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportMetadata>, sqlx::Error> {
        let reports = self.reports.lock().unwrap();
        Ok(reports
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
