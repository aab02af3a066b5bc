use std::collections::HashMap;

/// Objection ceiling applied when a supplier is unknown or has no explicit limit.
pub const DEFAULT_MAX_OBJECTION_COUNT: u32 = 4;

/// Supplier identity and business limits, built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierPolicy {
    names: HashMap<i64, String>,
    max_objections: HashMap<String, u32>,
    default_max_objections: u32,
}

impl SupplierPolicy {
    pub fn new(
        names: HashMap<i64, String>,
        max_objections: HashMap<String, u32>,
        default_max_objections: u32,
    ) -> Self {
        Self {
            names,
            max_objections,
            default_max_objections,
        }
    }

    /// Supplier table used in production.
    pub fn standard() -> Self {
        let names = [
            (27, "BG Lite"),
            (29, "British Gas Business"),
            (31, "EDF I&C"),
            (43, "EDF SME"),
            (44, "Corona"),
            (10061, "Crown Gas and Power"),
            (10062, "Scottish Power"),
            (10063, "Smartest Energy"),
            (10064, "SSE"),
            (10065, "Total Gas & Power"),
            (10066, "SEFE"),
        ]
        .into_iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

        let max_objections = [
            ("BG Lite", 4),
            ("EDF I&C", 4),
            ("EDF SME", 4),
            ("Smartest Energy", 6),
            ("Scottish Power", 3),
            ("SSE", 2),
        ]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();

        Self::new(names, max_objections, DEFAULT_MAX_OBJECTION_COUNT)
    }

    pub fn supplier_name(&self, supplier_id: i64) -> Option<&str> {
        self.names.get(&supplier_id).map(String::as_str)
    }

    pub fn max_objection_count(&self, supplier_id: i64) -> u32 {
        match self.supplier_name(supplier_id) {
            Some(name) => self.max_objection_count_by_name(name),
            None => self.default_max_objections,
        }
    }

    pub fn max_objection_count_by_name(&self, supplier_name: &str) -> u32 {
        if supplier_name.trim().is_empty() {
            return self.default_max_objections;
        }
        self.max_objections
            .get(supplier_name)
            .copied()
            .unwrap_or(self.default_max_objections)
    }
}

impl Default for SupplierPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
