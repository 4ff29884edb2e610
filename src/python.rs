use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::category::EmissionCategory;
use crate::config::Settings;
use crate::error::GhgError;
use crate::logging;
use crate::model::InventoryModel;
use crate::project::BoundaryApproach;
use crate::report::ReportConfig;

#[pyclass(name = "InventoryModel")]
pub struct PyInventoryModel {
    inner: InventoryModel,
}

#[pymethods]
impl PyInventoryModel {
    #[new]
    #[pyo3(signature = (base_path, company_name, reporting_year, boundary=None))]
    fn new(
        base_path: String,
        company_name: &str,
        reporting_year: i32,
        boundary: Option<&str>,
    ) -> PyResult<Self> {
        let mut inner = InventoryModel::with_defaults(base_path, company_name, reporting_year);
        if let Some(b) = boundary {
            let approach: BoundaryApproach = b.parse()?;
            inner.project_mut().set_boundary_approach(approach)?;
        }
        Ok(Self { inner })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load any CSV into a Polars DataFrame with all columns as strings.
    #[pyo3(signature = (filename, rename=None))]
    fn load_csv(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.load_csv(filename, rename)?))
    }

    #[pyo3(signature = (filename=None))]
    fn load_facilities(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.load_facilities(filename)?))
    }

    #[pyo3(signature = (filename=None))]
    fn load_sources(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.load_sources(filename)?))
    }

    /// Returns the number of factors added.
    #[pyo3(signature = (filename=None))]
    fn load_custom_factors(&mut self, filename: Option<&str>) -> PyResult<usize> {
        Ok(self.inner.load_custom_factors(filename)?)
    }

    // ── Boundary ────────────────────────────────────────────────────────────

    /// One of "operational", "financial", "equity". Can be set once.
    fn set_boundary_approach(&mut self, approach: &str) -> PyResult<()> {
        let approach: BoundaryApproach = approach.parse()?;
        Ok(self.inner.project_mut().set_boundary_approach(approach)?)
    }

    fn set_scope3_enabled(&mut self, enabled: bool) {
        self.inner.project_mut().set_scope3_enabled(enabled);
    }

    fn set_scope3_category(&mut self, category: &str, enabled: bool) -> PyResult<()> {
        let category: EmissionCategory = category.parse()?;
        Ok(self
            .inner
            .project_mut()
            .set_scope3_category(category, enabled)?)
    }

    // ── Calculation ─────────────────────────────────────────────────────────

    fn calculate(&mut self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.calculate()?))
    }

    fn scope_totals(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.scope_totals()?))
    }

    fn facility_breakdown(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.facility_breakdown()?))
    }

    fn category_breakdown(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.category_breakdown()?))
    }

    /// Full results as a JSON string.
    fn results_json(&self) -> PyResult<String> {
        let results = self
            .inner
            .results()
            .ok_or_else(|| GhgError::NotLoaded("results (call calculate first)".into()))?;
        Ok(results.to_json()?)
    }

    #[pyo3(signature = (filename=None))]
    fn export_results(&self, filename: Option<&str>) -> PyResult<String> {
        let path = self.inner.export_results(filename)?;
        Ok(path.display().to_string())
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    fn save_project(&mut self, filename: &str) -> PyResult<String> {
        Ok(self.inner.save_project(filename)?.display().to_string())
    }

    fn load_project(&mut self, filename: &str) -> PyResult<()> {
        Ok(self.inner.load_project(filename)?)
    }

    // ── Report ──────────────────────────────────────────────────────────────

    /// `settings_path` supplies theme, language and currency.
    #[pyo3(signature = (title=None, include_formulas=true, include_warnings=true, settings_path=None))]
    fn report_html(
        &self,
        title: Option<String>,
        include_formulas: bool,
        include_warnings: bool,
        settings_path: Option<PathBuf>,
    ) -> PyResult<String> {
        let base = match settings_path {
            Some(path) => ReportConfig::from_settings(&Settings::load(&path)?),
            None => ReportConfig::default(),
        };
        let config = ReportConfig {
            title,
            include_formulas,
            include_warnings,
            ..base
        };
        Ok(self.inner.report_html(&config)?)
    }
}

/// Install a log subscriber; `RUST_LOG` overrides `filter`.
#[pyfunction]
#[pyo3(signature = (filter=None))]
pub fn init_logging(filter: Option<&str>) -> PyResult<()> {
    Ok(logging::init(filter)?)
}

/// Install a log subscriber at the level saved in the settings file.
#[pyfunction]
pub fn init_logging_from_settings(settings_path: PathBuf) -> PyResult<()> {
    Ok(Settings::load(&settings_path)?.init_logging()?)
}

/// Category keys in reporting order.
#[pyfunction]
pub fn categories() -> Vec<&'static str> {
    EmissionCategory::ALL.iter().map(|c| c.as_str()).collect()
}
