//! Dotted-path navigation over a decoded graph.
//!
//! A path like `"player.inventory.3.id"` walks member names through class
//! records and numeric indices through arrays. Reference records are
//! resolved transparently at every step (and once more after the last
//! segment), so a path behaves the same whether a slot holds its target
//! inline or by object ID.

use crate::error::{NrbfError, Result};
use crate::graph::{ObjectGraph, RecordId};
use crate::record::{BinaryType, PrimitiveTypedRecord, Record, Value};

impl ObjectGraph {
    /// Looks up the value at a dotted path from the root.
    ///
    /// Returns `Ok(None)` when any segment does not exist; a reference that
    /// cannot be resolved along the way is an error, not a miss.
    pub fn get_path(&self, path: &str) -> Result<Option<Value>> {
        let Some(root) = self.root() else {
            return Ok(None);
        };
        let mut current = Value::Record(root);
        for segment in path.split('.') {
            current = self.resolve_value(current)?;
            match self.child_of(&current, segment) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        self.resolve_value(current).map(Some)
    }

    /// Overwrites the value at a dotted path from the root.
    ///
    /// A bare primitive written into an untyped slot (a class without member
    /// type info, or an object/string array element) is wrapped in a
    /// `MemberPrimitiveTyped` record here, at set-time, so the encoder never
    /// meets a slot it cannot give a wire form.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::UnknownMember`] when a segment does not exist,
    /// [`NrbfError::UnresolvedReference`] when a reference on the way is
    /// dangling.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        let root = self
            .root()
            .ok_or(NrbfError::RootNotFound { root_id: self.header().root_id })?;

        let segments: Vec<&str> = path.split('.').collect();
        let (&last, walk) = match segments.split_last() {
            Some(pair) => pair,
            None => return Ok(()),
        };

        let mut current = Value::Record(root);
        for &segment in walk {
            current = self.resolve_value(current)?;
            current = self.child_of(&current, segment).ok_or_else(|| {
                NrbfError::UnknownMember {
                    class: self.value_label(&current),
                    name: segment.to_owned(),
                }
            })?;
        }
        let target = self.resolve_value(current)?;
        let Value::Record(target_id) = target else {
            return Err(NrbfError::UnknownMember {
                class: self.value_label(&target),
                name: last.to_owned(),
            });
        };

        let value = self.wrap_for_slot(target_id, value)?;
        self.apply(target_id, last, value)
    }

    /// One navigation step: member name through a class, index through an
    /// array. Returns `None` when the step does not apply.
    fn child_of(&self, value: &Value, segment: &str) -> Option<Value> {
        let Value::Record(id) = value else {
            return None;
        };
        let index = segment.parse::<usize>().ok();
        match self.record(*id) {
            Record::Class(c) => c.get_value(segment).cloned(),
            Record::Array(a) => a.elements.get(index?).cloned(),
            Record::ObjectArray(a) => a.elements.get(index?).cloned(),
            Record::StringArray(a) => a.elements.get(index?).cloned(),
            Record::PrimitiveArray(a) => {
                a.values.get(index?).cloned().map(Value::Primitive)
            }
            _ => None,
        }
    }

    fn apply(&mut self, target_id: RecordId, segment: &str, value: Value) -> Result<()> {
        let index = segment.parse::<usize>().ok();
        let miss = |class: &str| NrbfError::UnknownMember {
            class: class.to_owned(),
            name: segment.to_owned(),
        };
        match self.record_mut(target_id) {
            Record::Class(c) => c.set_value(segment, value),
            Record::Array(a) => {
                let i = index.ok_or_else(|| miss("BinaryArray"))?;
                if a.elements.set(i, value) {
                    Ok(())
                } else {
                    Err(miss("BinaryArray"))
                }
            }
            Record::ObjectArray(a) => {
                let i = index.ok_or_else(|| miss("ArraySingleObject"))?;
                if a.elements.set(i, value) {
                    Ok(())
                } else {
                    Err(miss("ArraySingleObject"))
                }
            }
            Record::StringArray(a) => {
                let i = index.ok_or_else(|| miss("ArraySingleString"))?;
                if a.elements.set(i, value) {
                    Ok(())
                } else {
                    Err(miss("ArraySingleString"))
                }
            }
            Record::PrimitiveArray(a) => {
                let i = index.ok_or_else(|| miss("ArraySinglePrimitive"))?;
                match value {
                    Value::Primitive(p) if i < a.values.len() => {
                        a.values[i] = p;
                        Ok(())
                    }
                    Value::Primitive(_) => Err(miss("ArraySinglePrimitive")),
                    _ => Err(NrbfError::EncodeTypeAmbiguous {
                        class: "ArraySinglePrimitive".to_owned(),
                        member: segment.to_owned(),
                    }),
                }
            }
            other => Err(miss(&record_label(other))),
        }
    }

    /// Wraps a bare primitive headed for an untyped slot in a
    /// `MemberPrimitiveTyped` record; typed slots and non-primitive values
    /// pass through untouched.
    fn wrap_for_slot(&mut self, target_id: RecordId, value: Value) -> Result<Value> {
        let Value::Primitive(primitive) = &value else {
            return Ok(value);
        };
        let untyped = match self.record(target_id) {
            Record::Class(c) => !c.is_typed(),
            Record::ObjectArray(_) | Record::StringArray(_) => true,
            Record::Array(a) => a.element_type != BinaryType::Primitive,
            _ => false,
        };
        if !untyped {
            return Ok(value);
        }
        let wrapped = Record::PrimitiveTyped(PrimitiveTypedRecord {
            primitive_type: primitive.primitive_type(),
            value: value.clone(),
        });
        let id = self.add_record(wrapped)?;
        Ok(Value::Record(id))
    }

    fn value_label(&self, value: &Value) -> String {
        match value {
            Value::Primitive(_) => "<primitive>".to_owned(),
            Value::Null => "<null>".to_owned(),
            Value::Record(id) => record_label(self.record(*id)),
        }
    }
}

fn record_label(record: &Record) -> String {
    match record {
        Record::Class(c) => c.type_name().to_owned(),
        other => format!("{:?}", other.record_kind()),
    }
}
