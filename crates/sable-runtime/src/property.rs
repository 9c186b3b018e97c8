//! Declared-property metadata and attribute-string encoding
//!
//! Properties carry a name, an encoded type string, and a small set of
//! storage/accessor attributes. The attribute string is the compact ASCII
//! encoding the introspection surface hands out: comma-delimited segments,
//! each a single-letter tag optionally followed by a value.

/// Compile-time property record, as emitted into a symbol table.
///
/// All fields are const-constructible so a compiled unit can place its
/// definitions in `static` tables. Use [`PropertyDef::new`] plus struct
/// update syntax to set only the attributes that apply.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    /// Property name.
    pub name: &'static str,
    /// Encoded type string (the `T` segment value).
    pub type_encoding: &'static str,
    /// Read-only (`R`).
    pub readonly: bool,
    /// Copy-on-assign ownership (`C`).
    pub copy: bool,
    /// Strong/retain ownership (`&`).
    pub strong: bool,
    /// Weak ownership (`W`).
    pub weak: bool,
    /// Accessors are provided dynamically at runtime (`D`).
    pub dynamic: bool,
    /// Non-atomic accessors (`N`).
    pub nonatomic: bool,
    /// Custom getter selector name (`G`).
    pub getter: Option<&'static str>,
    /// Custom setter selector name (`S`).
    pub setter: Option<&'static str>,
    /// Backing instance-variable name (`V`).
    pub ivar: Option<&'static str>,
}

impl PropertyDef {
    /// A plain read-write property with no attributes beyond its type.
    pub const fn new(name: &'static str, type_encoding: &'static str) -> Self {
        Self {
            name,
            type_encoding,
            readonly: false,
            copy: false,
            strong: false,
            weak: false,
            dynamic: false,
            nonatomic: false,
            getter: None,
            setter: None,
            ivar: None,
        }
    }
}

/// Runtime property metadata, owned by the declaring class or protocol.
///
/// Immutable after creation, so the canonical attribute string is rendered
/// once and two calls always return byte-identical text.
#[derive(Debug)]
pub struct Property {
    name: Box<str>,
    encoded: Box<str>,
}

impl Property {
    /// Materialize a property from its symbol-table record.
    pub(crate) fn from_def(def: &PropertyDef) -> Self {
        Self {
            name: def.name.into(),
            encoded: encode_attributes(def).into_boxed_str(),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical encoded attribute string.
    ///
    /// Segments appear in a fixed order (`T` first, then the single-letter
    /// flags, then `G`/`S`, with `V` last), so the result is deterministic.
    pub fn attribute_string(&self) -> &str {
        &self.encoded
    }

    /// The value segment for one attribute tag, or `None` if absent.
    ///
    /// Bare flags (such as `N`) yield an empty string. Lookups tolerate any
    /// segment order, not just the canonical one.
    pub fn attribute_value(&self, tag: &str) -> Option<String> {
        attribute_value_in(&self.encoded, tag)
    }
}

/// Render the canonical attribute string for a property record.
fn encode_attributes(def: &PropertyDef) -> String {
    let mut segments: Vec<String> = Vec::new();
    segments.push(format!("T{}", def.type_encoding));
    if def.readonly {
        segments.push("R".to_string());
    }
    if def.copy {
        segments.push("C".to_string());
    }
    if def.strong {
        segments.push("&".to_string());
    }
    if def.weak {
        segments.push("W".to_string());
    }
    if def.nonatomic {
        segments.push("N".to_string());
    }
    if def.dynamic {
        segments.push("D".to_string());
    }
    if let Some(getter) = def.getter {
        segments.push(format!("G{getter}"));
    }
    if let Some(setter) = def.setter {
        segments.push(format!("S{setter}"));
    }
    if let Some(ivar) = def.ivar {
        segments.push(format!("V{ivar}"));
    }
    segments.join(",")
}

/// Find the value for `tag` in an encoded attribute string.
///
/// Each segment runs from its single-character tag to the next comma or end
/// of string. Unknown tags in the input are skipped, not rejected.
pub(crate) fn attribute_value_in(encoded: &str, tag: &str) -> Option<String> {
    for segment in encoded.split(',') {
        if let Some(value) = segment.strip_prefix(tag) {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_property_encoding() {
        let prop = Property::from_def(&PropertyDef::new("value", "i"));
        assert_eq!(prop.attribute_string(), "Ti");
        assert_eq!(prop.name(), "value");
    }

    #[test]
    fn test_full_encoding_order() {
        let def = PropertyDef {
            readonly: true,
            copy: true,
            strong: true,
            weak: true,
            dynamic: true,
            nonatomic: true,
            getter: Some("isOn"),
            setter: Some("setOn:"),
            ivar: Some("_on"),
            ..PropertyDef::new("on", "B")
        };
        let prop = Property::from_def(&def);
        assert_eq!(prop.attribute_string(), "TB,R,C,&,W,N,D,GisOn,SsetOn:,V_on");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let def = PropertyDef {
            nonatomic: true,
            readonly: true,
            ..PropertyDef::new("count", "Q")
        };
        let prop = Property::from_def(&def);
        assert_eq!(prop.attribute_string(), prop.attribute_string());
        assert_eq!(prop.attribute_string(), "TQ,R,N");
    }

    #[test]
    fn test_attribute_value_roundtrips_type() {
        let prop = Property::from_def(&PropertyDef::new("origin", "{Point=dd}"));
        assert_eq!(prop.attribute_value("T").as_deref(), Some("{Point=dd}"));
    }

    #[test]
    fn test_flag_value_is_empty_marker() {
        let def = PropertyDef {
            nonatomic: true,
            ..PropertyDef::new("value", "i")
        };
        let prop = Property::from_def(&def);
        assert_eq!(prop.attribute_value("N").as_deref(), Some(""));
    }

    #[test]
    fn test_absent_tag_is_none() {
        let prop = Property::from_def(&PropertyDef::new("value", "i"));
        assert_eq!(prop.attribute_value("G"), None);
        assert_eq!(prop.attribute_value("R"), None);
    }

    #[test]
    fn test_lookup_tolerates_any_order() {
        assert_eq!(
            attribute_value_in("N,V_x,Ti", "T").as_deref(),
            Some("i")
        );
        assert_eq!(
            attribute_value_in("Ggetter,Ti,R", "G").as_deref(),
            Some("getter")
        );
        assert_eq!(attribute_value_in("N,Ti", "S"), None);
    }
}
