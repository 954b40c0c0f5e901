//! Registry mapping index names to implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use climate_common::{Aggregation, ClimateError, ClimateResult, SeriesView};

use super::{ClimateIndex, CountIndex, IndexResult, IndexSpec, SpellIndex};
use crate::mask::RegionMask;

/// The closed set of indices shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinIndex {
    Cdd,
    Cwd,
    R10mm,
    R20mm,
}

impl BuiltinIndex {
    pub const ALL: [BuiltinIndex; 4] = [
        BuiltinIndex::Cdd,
        BuiltinIndex::Cwd,
        BuiltinIndex::R10mm,
        BuiltinIndex::R20mm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinIndex::Cdd => "cdd",
            BuiltinIndex::Cwd => "cwd",
            BuiltinIndex::R10mm => "r10mm",
            BuiltinIndex::R20mm => "r20mm",
        }
    }

    /// Instantiate the implementation.
    pub fn create(self) -> Arc<dyn ClimateIndex> {
        match self {
            BuiltinIndex::Cdd => Arc::new(SpellIndex::cdd()),
            BuiltinIndex::Cwd => Arc::new(SpellIndex::cwd()),
            BuiltinIndex::R10mm => Arc::new(CountIndex::r10mm()),
            BuiltinIndex::R20mm => Arc::new(CountIndex::r20mm()),
        }
    }
}

impl FromStr for BuiltinIndex {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        BuiltinIndex::ALL
            .into_iter()
            .find(|b| b.as_str() == name)
            .ok_or_else(|| ClimateError::config_invalid(format!("unknown built-in index '{}'", s)))
    }
}

impl fmt::Display for BuiltinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An index bound to its validated configuration.
#[derive(Clone)]
pub struct ResolvedIndex {
    pub spec: IndexSpec,
    pub index: Arc<dyn ClimateIndex>,
}

impl ResolvedIndex {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn compute(&self, view: SeriesView<'_>, mask: &RegionMask) -> ClimateResult<IndexResult> {
        self.index.compute(view, mask, &self.spec)
    }
}

impl fmt::Debug for ResolvedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedIndex")
            .field("spec", &self.spec)
            .field("variable", &self.index.variable())
            .finish()
    }
}

/// Catalog of available indices, keyed by lowercase name.
///
/// New indices are added with [`register`](Self::register); the orchestrator
/// only ever goes through [`resolve`](Self::resolve).
#[derive(Clone)]
pub struct IndexRegistry {
    indices: BTreeMap<String, Arc<dyn ClimateIndex>>,
}

impl IndexRegistry {
    pub fn empty() -> Self {
        Self {
            indices: BTreeMap::new(),
        }
    }

    /// Registry holding every [`BuiltinIndex`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for builtin in BuiltinIndex::ALL {
            registry
                .indices
                .insert(builtin.as_str().to_string(), builtin.create());
        }
        registry
    }

    /// Add an index; fails if the name is already taken.
    pub fn register(&mut self, index: Arc<dyn ClimateIndex>) -> ClimateResult<()> {
        let name = index.name().trim().to_lowercase();
        if name.is_empty() {
            return Err(ClimateError::config_invalid("index name must not be empty"));
        }
        if self.indices.contains_key(&name) {
            return Err(ClimateError::config_invalid(format!(
                "index '{}' is already registered",
                name
            )));
        }
        self.indices.insert(name, index);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ClimateIndex>> {
        self.indices.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(&name.trim().to_lowercase())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.indices.keys().map(String::as_str).collect()
    }

    /// Validate a configured index and fill in parameter defaults.
    ///
    /// Fails with `ConfigInvalid` for an unknown name, an unknown parameter
    /// key, or a non-finite or non-positive parameter value.
    pub fn resolve(
        &self,
        name: &str,
        aggregation: Option<Aggregation>,
        params: &BTreeMap<String, f64>,
    ) -> ClimateResult<ResolvedIndex> {
        let key = name.trim().to_lowercase();
        let index = self.indices.get(&key).cloned().ok_or_else(|| {
            ClimateError::config_invalid(format!(
                "unknown index '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;

        let accepted = index.parameters();
        if let Some(unknown) = params
            .keys()
            .find(|k| !accepted.iter().any(|p| p.name == k.as_str()))
        {
            return Err(ClimateError::config_invalid(format!(
                "index '{}' has no parameter '{}'",
                key, unknown
            )));
        }

        let mut spec = IndexSpec::new(key.clone(), aggregation.unwrap_or_default());
        for param in accepted {
            let value = params.get(param.name).copied().unwrap_or(param.default);
            if !value.is_finite() || value <= 0.0 {
                return Err(ClimateError::config_invalid(format!(
                    "{}.{} must be a positive number, got {}",
                    key, param.name, value
                )));
            }
            spec.params.insert(param.name.to_string(), value);
        }

        Ok(ResolvedIndex { spec, index })
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ParamSpec, THRESHOLD_MM};

    struct ConstantIndex;

    impl ClimateIndex for ConstantIndex {
        fn name(&self) -> &str {
            "const"
        }
        fn description(&self) -> &str {
            "always 1"
        }
        fn units(&self) -> &str {
            "1"
        }
        fn parameters(&self) -> &[ParamSpec] {
            &[]
        }
        fn compute(
            &self,
            view: SeriesView<'_>,
            mask: &RegionMask,
            spec: &IndexSpec,
        ) -> ClimateResult<IndexResult> {
            let periods = view.periods(spec.aggregation);
            let n = view.grid.n_cells();
            let mut values = vec![f32::NAN; periods.len() * n];
            for p in 0..periods.len() {
                for &c in mask.selected() {
                    values[p * n + c] = 1.0;
                }
            }
            Ok(IndexResult {
                index: spec.name.clone(),
                aggregation: spec.aggregation,
                periods: periods.periods().to_vec(),
                shape: view.grid.shape(),
                values,
            })
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = IndexRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["cdd", "cwd", "r10mm", "r20mm"]);
        assert!(registry.contains("CDD"));
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let registry = IndexRegistry::with_builtins();
        let resolved = registry.resolve("r10mm", None, &BTreeMap::new()).unwrap();
        assert_eq!(resolved.spec.param(THRESHOLD_MM), Some(10.0));
        assert_eq!(resolved.spec.aggregation, Aggregation::Annual);
    }

    #[test]
    fn test_resolve_rejects_unknown_index() {
        let registry = IndexRegistry::with_builtins();
        let err = registry.resolve("spi", None, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ClimateError::ConfigInvalid(ref m) if m.contains("spi")));
    }

    #[test]
    fn test_resolve_rejects_bad_params() {
        let registry = IndexRegistry::with_builtins();
        let mut params = BTreeMap::new();
        params.insert("window".to_string(), 3.0);
        assert!(registry.resolve("cdd", None, &params).is_err());

        let mut params = BTreeMap::new();
        params.insert(THRESHOLD_MM.to_string(), -1.0);
        assert!(registry.resolve("cdd", None, &params).is_err());
    }

    #[test]
    fn test_register_custom_index() {
        let mut registry = IndexRegistry::with_builtins();
        registry.register(Arc::new(ConstantIndex)).unwrap();
        assert!(registry.resolve("const", Some(Aggregation::Monthly), &BTreeMap::new()).is_ok());
        assert!(registry.register(Arc::new(ConstantIndex)).is_err());
    }

    #[test]
    fn test_builtin_from_str() {
        assert_eq!("R20mm".parse::<BuiltinIndex>().unwrap(), BuiltinIndex::R20mm);
        assert!("tx90p".parse::<BuiltinIndex>().is_err());
    }
}
