//! Type-distance substrate for factory resolution
//!
//! Blueprint data types form single-inheritance chains described by static
//! [`DataType`] descriptors. Factory resolution walks these chains to find
//! the sub-factory advertising the exact type or the nearest ancestor.

/// Static descriptor for a blueprint data type.
///
/// Descriptors are declared as `static` items and referenced by address, so
/// identity comparison is pointer comparison.
///
/// # Example
///
/// ```
/// use meridian_world::types::DataType;
///
/// static COMPONENT_DATA: DataType = DataType::base("ComponentData");
/// static LIGHT_DATA: DataType = DataType::derived("LightData", &COMPONENT_DATA);
///
/// assert_eq!(LIGHT_DATA.distance_to(&COMPONENT_DATA), Some(1));
/// ```
#[derive(Debug)]
pub struct DataType {
    name: &'static str,
    parent: Option<&'static DataType>,
}

impl DataType {
    /// Declare a root data type with no parent.
    #[must_use]
    pub const fn base(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declare a data type derived from `parent`.
    #[must_use]
    pub const fn derived(name: &'static str, parent: &'static DataType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The type's name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The immediate parent type, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static DataType> {
        self.parent
    }

    /// Check whether `ancestor` appears in this type's chain (inclusive).
    #[must_use]
    pub fn is_a(&'static self, ancestor: &'static DataType) -> bool {
        self.distance_to(ancestor).is_some()
    }

    /// Number of derivation steps from this type up to `ancestor`.
    ///
    /// Returns `Some(0)` for the type itself, `None` if `ancestor` is not in
    /// the chain.
    #[must_use]
    pub fn distance_to(&'static self, ancestor: &'static DataType) -> Option<u32> {
        let mut current = self;
        let mut distance = 0;
        loop {
            if std::ptr::eq(current, ancestor) {
                return Some(distance);
            }
            current = current.parent?;
            distance += 1;
        }
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for DataType {}

#[cfg(test)]
mod tests {
    use super::*;

    static ROOT: DataType = DataType::base("Root");
    static MID: DataType = DataType::derived("Mid", &ROOT);
    static LEAF: DataType = DataType::derived("Leaf", &MID);
    static OTHER: DataType = DataType::base("Other");

    #[test]
    fn test_distance_along_chain() {
        assert_eq!(LEAF.distance_to(&LEAF), Some(0));
        assert_eq!(LEAF.distance_to(&MID), Some(1));
        assert_eq!(LEAF.distance_to(&ROOT), Some(2));
        assert_eq!(ROOT.distance_to(&LEAF), None);
    }

    #[test]
    fn test_unrelated_types() {
        assert_eq!(LEAF.distance_to(&OTHER), None);
        assert!(!LEAF.is_a(&OTHER));
        assert!(LEAF.is_a(&ROOT));
    }

    #[test]
    fn test_identity_is_pointer_identity() {
        static TWIN: DataType = DataType::base("Root");
        assert_ne!(&ROOT, &TWIN);
        assert_eq!(&ROOT, &ROOT);
    }
}
