use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::delivery::Delivery;
use super::field::{ItemField, Period};
use super::ids::ItemId;

/// A line item of a list.
///
/// Items live inside their owning [`super::list::List`]; tracked mutations go
/// through the list so every change is diffed and logged. The fields here are
/// plain data, validation happens on the update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub comment: Option<String>,
    pub deliveries: BTreeMap<Period, Delivery>,
}

impl ListItem {
    #[must_use]
    pub fn new(id: ItemId, name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            unit: None,
            comment: None,
            deliveries: BTreeMap::new(),
        }
    }

    /// Current value of a tracked business field, as JSON.
    ///
    /// Unset optional fields read as `null`.
    #[must_use]
    pub fn field_value(&self, field: ItemField) -> Value {
        match field {
            ItemField::Name => Value::String(self.name.clone()),
            ItemField::Quantity => Value::from(self.quantity),
            ItemField::Unit => self
                .unit
                .as_ref()
                .map_or(Value::Null, |u| Value::String(u.clone())),
            ItemField::Comment => self
                .comment
                .as_ref()
                .map_or(Value::Null, |c| Value::String(c.clone())),
        }
    }

    /// Check that `value` has the shape `field` accepts.
    ///
    /// `name` wants a non-blank string, `quantity` a non-negative integer,
    /// `unit` and `comment` a string or `null`. An empty string on the
    /// optional fields clears them.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValue`] naming the field and the violated rule.
    pub fn validate_value(field: ItemField, value: &Value) -> Result<(), InvalidValue> {
        match field {
            ItemField::Name => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                Some(_) => Err(InvalidValue {
                    field,
                    reason: "must not be blank",
                }),
                None => Err(InvalidValue {
                    field,
                    reason: "must be a string",
                }),
            },
            ItemField::Quantity => match value.as_i64() {
                Some(q) if q >= 0 => Ok(()),
                Some(_) => Err(InvalidValue {
                    field,
                    reason: "must not be negative",
                }),
                None => Err(InvalidValue {
                    field,
                    reason: "must be an integer",
                }),
            },
            ItemField::Unit | ItemField::Comment => {
                if value.is_null() || value.is_string() {
                    Ok(())
                } else {
                    Err(InvalidValue {
                        field,
                        reason: "must be a string or null",
                    })
                }
            }
        }
    }

    /// Canonical form of an update payload for diffing.
    ///
    /// Empty strings and `null` on the optional fields both mean "cleared",
    /// so they normalize to `null` before old/new comparison.
    pub(crate) fn normalize_value(field: ItemField, value: &Value) -> Value {
        match field {
            ItemField::Unit | ItemField::Comment => match value.as_str() {
                Some(s) if !s.is_empty() => Value::String(s.to_string()),
                _ => Value::Null,
            },
            ItemField::Name | ItemField::Quantity => value.clone(),
        }
    }

    /// Validate and set a tracked field, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValue`] and leaves the item untouched when the value
    /// fails [`Self::validate_value`].
    pub(crate) fn apply_value(
        &mut self,
        field: ItemField,
        value: &Value,
    ) -> Result<Value, InvalidValue> {
        Self::validate_value(field, value)?;
        let old = self.field_value(field);
        match field {
            ItemField::Name => {
                // validate_value guarantees a non-blank string here
                if let Some(s) = value.as_str() {
                    self.name = s.to_string();
                }
            }
            ItemField::Quantity => {
                if let Some(q) = value.as_i64() {
                    self.quantity = q;
                }
            }
            ItemField::Unit => self.unit = opt_string(value),
            ItemField::Comment => self.comment = opt_string(value),
        }
        Ok(old)
    }

    #[must_use]
    pub fn delivery(&self, period: &Period) -> Option<&Delivery> {
        self.deliveries.get(period)
    }
}

fn opt_string(value: &Value) -> Option<String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

/// Error returned when a field update payload has the wrong shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue {
    pub field: ItemField,
    pub reason: &'static str,
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for InvalidValue {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> ListItem {
        ListItem::new(ItemId::new("i-1"), "Rye flour", 5)
    }

    #[test]
    fn field_values_read_as_json() {
        let mut it = item();
        it.unit = Some("kg".to_string());
        assert_eq!(it.field_value(ItemField::Name), json!("Rye flour"));
        assert_eq!(it.field_value(ItemField::Quantity), json!(5));
        assert_eq!(it.field_value(ItemField::Unit), json!("kg"));
        assert_eq!(it.field_value(ItemField::Comment), Value::Null);
    }

    #[test]
    fn apply_returns_previous_value() {
        let mut it = item();
        let old = it.apply_value(ItemField::Quantity, &json!(10)).expect("apply");
        assert_eq!(old, json!(5));
        assert_eq!(it.quantity, 10);
    }

    #[test]
    fn name_rejects_blank_and_non_string() {
        let mut it = item();
        assert!(it.apply_value(ItemField::Name, &json!("  ")).is_err());
        assert!(it.apply_value(ItemField::Name, &json!(3)).is_err());
        assert!(it.apply_value(ItemField::Name, &Value::Null).is_err());
        assert_eq!(it.name, "Rye flour");
    }

    #[test]
    fn quantity_rejects_negative_and_fractional() {
        let mut it = item();
        assert!(it.apply_value(ItemField::Quantity, &json!(-1)).is_err());
        assert!(it.apply_value(ItemField::Quantity, &json!(2.5)).is_err());
        assert!(it.apply_value(ItemField::Quantity, &json!("7")).is_err());
        assert_eq!(it.quantity, 5);
    }

    #[test]
    fn empty_string_clears_optional_fields() {
        let mut it = item();
        it.apply_value(ItemField::Comment, &json!("urgent")).expect("set");
        assert_eq!(it.comment.as_deref(), Some("urgent"));
        it.apply_value(ItemField::Comment, &json!("")).expect("clear");
        assert_eq!(it.comment, None);
        it.apply_value(ItemField::Unit, &Value::Null).expect("null clears");
        assert_eq!(it.unit, None);
    }

    #[test]
    fn invalid_value_display_names_field() {
        let err = ListItem::validate_value(ItemField::Quantity, &json!("x")).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for quantity: must be an integer");
    }
}
