//! CSV-backed [`GridStore`]: one directory, one `<tab>.csv` per tab.
//! Good enough for local workbooks and the CLI; the engine only ever
//! sees the trait.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::StoreError;
use crate::grid::Grid;
use crate::store::GridStore;

pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(CsvStore { dir })
    }

    fn path_for(&self, tab: &str) -> PathBuf {
        // Slashes would escape the directory; nothing else needs care.
        let safe = tab.replace(['/', '\\'], "_");
        self.dir.join(format!("{safe}.csv"))
    }

    fn load_rows(&self, tab: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let path = self.path_for(tab);
        if !path.exists() {
            return Err(StoreError::UnknownTab(tab.to_string()));
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn save_rows(&self, tab: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let path = self.path_for(tab);
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))?;
        Ok(())
    }
}

impl GridStore for CsvStore {
    fn tab_titles(&mut self) -> Result<Vec<String>, StoreError> {
        let mut titles = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".csv") {
                titles.push(stem.to_string());
            }
        }
        // Directory order is arbitrary; keep it deterministic.
        titles.sort();
        Ok(titles)
    }

    fn read_region(&mut self, tab: &str) -> Result<Grid, StoreError> {
        Ok(Grid::new(self.load_rows(tab)?))
    }

    fn write_cell(
        &mut self,
        tab: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        if row == 0 || col == 0 {
            return Err(StoreError::Malformed(format!(
                "cell coordinates are 1-indexed, got ({row}, {col})"
            )));
        }
        let mut rows = self.load_rows(tab)?;
        let (r, c) = (row - 1, col - 1);
        while rows.len() <= r {
            rows.push(Vec::new());
        }
        while rows[r].len() <= c {
            rows[r].push(String::new());
        }
        rows[r][c] = value.to_string();
        self.save_rows(tab, &rows)
    }

    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<(), StoreError> {
        let mut rows = self.load_rows(tab)?;
        rows.push(values.to_vec());
        self.save_rows(tab, &rows)
    }

    fn create_tab(&mut self, title: &str) -> Result<(), StoreError> {
        let path = self.path_for(title);
        if !path.exists() {
            fs::write(&path, "")?;
        }
        Ok(())
    }
}
