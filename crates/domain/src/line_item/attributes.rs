use crate::catalog::Attribute;

/// Orders a variant's attributes by type name, ascending.
///
/// The comparison is a plain byte-wise string comparison of the type's wire
/// name. The sort is stable and performs no deduplication, so repeated types
/// keep their relative order.
pub fn resolve_attributes(mut attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes.sort_by(|a, b| a.attribute_type.as_str().cmp(b.attribute_type.as_str()));
    attributes
}
