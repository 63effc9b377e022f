//! Scope-aware bookkeeping of SSA values per variable.
//!
//! Synthetic bodies are written as straight-line code with optional nested scopes.
//! [`ValueManager`] hands out fresh value numbers, remembers which value currently
//! represents each [`VariableKey`], and tells the caller when values flowing out of a
//! scope must be merged with a phi.
//!
//! # Slot Life Cycle
//!
//! Every value the manager hands out lives in a slot with a [`Status`]:
//!
//! ```text
//!  request_unallocated        confirm_allocation            exit_scope
//!  ------------------> Unallocated ------------> Allocated ------------> Invalidated
//!                                                    |                       |
//!                                                    |   confirm_phi (other) |
//!                                                    +-------> Closed <------+
//!
//!  request_free          confirm_phi (this slot)
//!  ------------> Free ----------------------------> Allocated
//!                 |  exit_scope / invalidate
//!                 +-------------------------> FreeInvalidated --confirm_phi--> Invalidated
//!                 |  confirm_phi (other slot)
//!                 +-------------------------> FreeClosed
//! ```
//!
//! Requesting a new value for a variable that already has an allocated value in the
//! same scope invalidates the old one. Values allocated in an outer scope stay live
//! until a phi closes them.

use std::{
    collections::{BTreeMap, HashMap},
    mem,
};

use crate::{
    ssa::{ParameterAccessor, SsaValue, ValueNumber, VariableKey},
    types::{well_known, MethodRef, TypeRef},
    Error, Result,
};

/// State of one managed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created but never handed out
    Unused,
    /// Handed out, the defining instruction is not confirmed yet
    Unallocated,
    /// Defined and live
    Allocated,
    /// Handed out as a phi result, the phi is not confirmed yet
    Free,
    /// Defined in a scope that was left or superseded; waits for a merge
    Invalidated,
    /// Merged by a phi; no longer live
    Closed,
    /// A free slot whose scope was left
    FreeInvalidated,
    /// A free slot that lost to another phi
    FreeClosed,
}

impl Status {
    /// Returns `true` for the states `exit_scope` tolerates in deeper scopes.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Unused | Self::Invalidated | Self::Closed | Self::FreeInvalidated | Self::FreeClosed
        )
    }

    /// Returns `true` for `Free` and its invalidated or closed variants.
    #[must_use]
    pub const fn is_free_family(self) -> bool {
        matches!(self, Self::Free | Self::FreeInvalidated | Self::FreeClosed)
    }
}

#[derive(Debug, Clone)]
struct Managed {
    value: SsaValue,
    status: Status,
    set_in_scope: usize,
    set_by: Option<usize>,
}

/// Allocates value numbers and tracks the live value of every variable.
#[derive(Debug)]
pub struct ValueManager {
    owner: MethodRef,
    next: u32,
    depth: usize,
    // Every key a variable was requested under, then its slots
    slots: Vec<(Vec<VariableKey>, Vec<Managed>)>,
    unmanaged: Vec<SsaValue>,
}

impl ValueManager {
    /// Creates a manager for a body of the accessor's method.
    ///
    /// The receiver and the parameters start out allocated in scope 0; fresh numbers
    /// start at [`ParameterAccessor::first_after`].
    ///
    /// # Errors
    ///
    /// Fails only if the accessor yields a `void` parameter.
    pub fn new(accessor: &ParameterAccessor) -> Result<Self> {
        let mut manager = Self {
            owner: accessor.method().clone(),
            next: accessor.first_after().get(),
            depth: 0,
            slots: Vec::new(),
            unmanaged: Vec::new(),
        };
        for value in accessor.all_with_receiver()? {
            manager.slots_mut(value.key()).push(Managed {
                value,
                status: Status::Allocated,
                set_in_scope: 0,
                set_by: None,
            });
        }
        Ok(manager)
    }

    /// The method owning every value this manager creates.
    #[must_use]
    pub fn owner(&self) -> &MethodRef {
        &self.owner
    }

    /// Current scope depth, 0 being the method body.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The next number a fresh value will get.
    #[must_use]
    pub fn next_number(&self) -> ValueNumber {
        ValueNumber(self.next)
    }

    /// Makes sure `number` is never handed out as a fresh number.
    pub fn reserve(&mut self, number: ValueNumber) {
        if number.get() >= self.next {
            self.next = number.get() + 1;
        }
    }

    fn take_number(&mut self) -> ValueNumber {
        let number = ValueNumber(self.next);
        self.next += 1;
        number
    }

    /// Finds the variable of `key`.
    ///
    /// A variable already requested under a key naming the same variable wins over one
    /// that merely compares equal, so a `ByType` lookup reaches the variable a
    /// `WeaklyByName` key of that type was stored in, whatever key came first.
    fn position(&self, key: &VariableKey) -> Option<usize> {
        self.slots
            .iter()
            .position(|(aliases, _)| aliases.iter().any(|a| a.names_same_variable(key)))
            .or_else(|| {
                self.slots
                    .iter()
                    .position(|(aliases, _)| aliases.iter().any(|a| a == key))
            })
    }

    fn slots(&self, key: &VariableKey) -> Option<&Vec<Managed>> {
        self.position(key).map(|position| &self.slots[position].1)
    }

    fn slots_mut(&mut self, key: &VariableKey) -> &mut Vec<Managed> {
        let position = match self.position(key) {
            Some(position) => position,
            None => {
                self.slots.push((Vec::new(), Vec::new()));
                self.slots.len() - 1
            }
        };
        let (aliases, slots) = &mut self.slots[position];
        let known = aliases
            .iter()
            .any(|a| mem::discriminant(a) == mem::discriminant(key) && a.names_same_variable(key));
        if !known {
            aliases.push(key.clone());
        }
        slots
    }

    fn known_slots(&self, key: &VariableKey) -> Result<&Vec<Managed>> {
        self.slots(key)
            .ok_or_else(|| Error::UnknownVariable(key.to_string()))
    }

    /// Hands out a value whose defining instruction is about to be built.
    ///
    /// An allocated value of the same variable set in the current scope is
    /// invalidated; it is being redefined.
    ///
    /// # Errors
    ///
    /// - [`Error::PendingAllocation`] when the variable already has a pending value
    /// - [`Error::VoidValue`] for `void`
    pub fn request_unallocated(&mut self, ty: &TypeRef, key: VariableKey) -> Result<SsaValue> {
        let depth = self.depth;
        if let Some(slots) = self.slots(&key) {
            if slots.iter().any(|s| s.status == Status::Unallocated) {
                return Err(Error::PendingAllocation(key.to_string()));
            }
        }
        let number = self.take_number();
        let value = SsaValue::new(number, ty.clone(), self.owner.clone(), key.clone())?;

        let slots = self.slots_mut(&key);
        for slot in slots.iter_mut() {
            if slot.status == Status::Allocated && slot.set_in_scope == depth {
                slot.status = Status::Invalidated;
            }
        }
        slots.push(Managed {
            value: value.clone(),
            status: Status::Unallocated,
            set_in_scope: depth,
            set_by: None,
        });
        Ok(value)
    }

    /// Confirms that instruction `set_by` defines `value`.
    ///
    /// A value of an unseen variable is adopted as allocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyAllocated`] if the variable is known but `value` is not
    /// its pending value.
    pub fn confirm_allocation(&mut self, value: &SsaValue, set_by: usize) -> Result<()> {
        let depth = self.depth;
        self.reserve(value.number());
        if self.slots(value.key()).is_none() {
            self.slots_mut(value.key()).push(Managed {
                value: value.clone(),
                status: Status::Allocated,
                set_in_scope: depth,
                set_by: Some(set_by),
            });
            return Ok(());
        }

        let slots = self.slots_mut(value.key());
        match slots
            .iter_mut()
            .find(|s| s.status == Status::Unallocated && s.value.number() == value.number())
        {
            Some(slot) => {
                slot.status = Status::Allocated;
                slot.set_in_scope = depth;
                slot.set_by = Some(set_by);
                Ok(())
            }
            None => Err(Error::AlreadyAllocated {
                value: value.to_string(),
                key: value.key().to_string(),
            }),
        }
    }

    /// Hands out a value that a phi will define.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoidValue`] for `void`.
    pub fn request_free(&mut self, ty: &TypeRef, key: VariableKey) -> Result<SsaValue> {
        let depth = self.depth;
        let number = self.take_number();
        let value = SsaValue::new(number, ty.clone(), self.owner.clone(), key.clone())?;
        self.slots_mut(&key).push(Managed {
            value: value.clone(),
            status: Status::Free,
            set_in_scope: depth,
            set_by: None,
        });
        Ok(value)
    }

    /// Confirms that the phi at `set_by` defines the free `value`.
    ///
    /// The merged operands are closed: allocated values of the variable set at or below
    /// the current depth and invalidated values from deeper scopes. Competing free
    /// values of the current scope become [`Status::FreeClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingPhi`] when `value` is not a free value of its variable.
    pub fn confirm_phi(&mut self, value: &SsaValue, set_by: usize) -> Result<()> {
        let depth = self.depth;
        let Some(position) = self.position(value.key()) else {
            return Err(Error::NoPendingPhi(value.to_string()));
        };
        let slots = &mut self.slots[position].1;
        let Some(target) = slots
            .iter()
            .position(|s| s.status.is_free_family() && s.value.number() == value.number())
        else {
            return Err(Error::NoPendingPhi(value.to_string()));
        };

        for (index, slot) in slots.iter_mut().enumerate() {
            if index == target {
                slot.status = match slot.status {
                    Status::Free => Status::Allocated,
                    Status::FreeInvalidated => Status::Invalidated,
                    _ => Status::Closed,
                };
                slot.set_by = Some(set_by);
                continue;
            }
            slot.status = match slot.status {
                Status::Allocated if slot.set_in_scope >= depth => Status::Closed,
                Status::Invalidated if slot.set_in_scope > depth => Status::Closed,
                Status::Free if slot.set_in_scope == depth => Status::FreeClosed,
                other => other,
            };
        }
        Ok(())
    }

    /// Creates a value outside the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoidValue`] for `void`.
    pub fn unmanaged(&mut self, ty: &TypeRef, key: VariableKey) -> Result<SsaValue> {
        let number = self.take_number();
        let value = SsaValue::new(number, ty.clone(), self.owner.clone(), key)?;
        self.unmanaged.push(value.clone());
        Ok(value)
    }

    /// A temporary receiving the exception of a call.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`ValueManager::unmanaged`].
    pub fn exception(&mut self) -> Result<SsaValue> {
        self.unmanaged(&well_known::EXCEPTION, VariableKey::unique())
    }

    fn visible(&self, key: &VariableKey, max_scope: usize) -> Result<SsaValue> {
        self.known_slots(key)?
            .iter()
            .filter(|s| matches!(s.status, Status::Allocated | Status::Free))
            .filter(|s| s.set_in_scope <= max_scope)
            .max_by_key(|s| (s.set_in_scope, s.value.number()))
            .map(|s| s.value.clone())
            .ok_or_else(|| Error::NoCurrentValue(key.to_string()))
    }

    /// The live value of the variable, innermost scope first.
    ///
    /// A pending phi result counts as live. Within one scope the most recent value wins,
    /// so a free value requested after an allocation shadows it.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownVariable`] for a key never seen
    /// - [`Error::NoCurrentValue`] when no allocated or free value is visible
    pub fn current(&self, key: &VariableKey) -> Result<SsaValue> {
        self.visible(key, self.depth)
    }

    /// The live value of the variable as seen from the enclosing scope.
    ///
    /// # Errors
    ///
    /// Same as [`ValueManager::current`]; at depth 0 there is no enclosing scope and the
    /// result is [`Error::NoCurrentValue`].
    pub fn super_value(&self, key: &VariableKey) -> Result<SsaValue> {
        match self.depth.checked_sub(1) {
            Some(outer) => self.visible(key, outer),
            None => {
                self.known_slots(key)?;
                Err(Error::NoCurrentValue(key.to_string()))
            }
        }
    }

    /// Operands a phi for the variable must merge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] for a key never seen.
    pub fn all_for_phi(&self, key: &VariableKey) -> Result<Vec<SsaValue>> {
        let depth = self.depth;
        let mut values: Vec<SsaValue> = self
            .known_slots(key)?
            .iter()
            .filter(|s| match s.status {
                Status::Allocated => true,
                Status::Invalidated => s.set_in_scope > depth,
                _ => false,
            })
            .map(|s| s.value.clone())
            .collect();
        values.sort_by_key(SsaValue::number);
        Ok(values)
    }

    /// Returns `true` once any value of the variable was handed out.
    #[must_use]
    pub fn is_seen(&self, key: &VariableKey) -> bool {
        self.slots(key).is_some()
    }

    /// Returns `true` when the variable has no live value or one is pending.
    #[must_use]
    pub fn needs_allocation(&self, key: &VariableKey) -> bool {
        match self.slots(key) {
            None => true,
            Some(slots) => {
                slots.iter().any(|s| s.status == Status::Unallocated)
                    || self.current(key).is_err()
            }
        }
    }

    /// Returns `true` when values of the variable wait to be merged.
    ///
    /// That is the case with a pending free value, with more than one allocated value,
    /// or with an invalidated value from a scope deeper than the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] for a key never seen.
    pub fn needs_phi(&self, key: &VariableKey) -> Result<bool> {
        let depth = self.depth;
        let slots = self.known_slots(key)?;
        let free = slots.iter().any(|s| s.status == Status::Free);
        let allocated = slots.iter().filter(|s| s.status == Status::Allocated).count();
        let pending_merge = slots
            .iter()
            .any(|s| s.status == Status::Invalidated && s.set_in_scope > depth);
        Ok(free || allocated > 1 || pending_merge)
    }

    /// Invalidates the live values of the variable set in the current scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] for a key never seen.
    pub fn invalidate(&mut self, key: &VariableKey) -> Result<()> {
        let depth = self.depth;
        self.known_slots(key)?;
        for slot in self.slots_mut(key) {
            if slot.set_in_scope != depth {
                continue;
            }
            slot.status = match slot.status {
                Status::Allocated => Status::Invalidated,
                Status::Free => Status::FreeInvalidated,
                other => other,
            };
        }
        Ok(())
    }

    /// Opens a nested scope.
    pub fn enter_scope(&mut self) {
        self.depth += 1;
    }

    /// Leaves the current scope, invalidating every value set in it.
    ///
    /// # Errors
    ///
    /// - [`Error::ScopeUnderflow`] at depth 0
    /// - [`Error::ScopeOrder`] when a value of a deeper scope is still live
    pub fn exit_scope(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::ScopeUnderflow);
        }
        let depth = self.depth;

        for (_, slots) in &self.slots {
            if let Some(live) = slots
                .iter()
                .find(|s| s.set_in_scope > depth && !s.status.is_settled())
            {
                return Err(Error::ScopeOrder(format!(
                    "{} of {} set in scope {} is still {:?} while leaving scope {depth}",
                    live.value,
                    live.value.key(),
                    live.set_in_scope,
                    live.status
                )));
            }
        }

        for (_, slots) in &mut self.slots {
            for slot in slots.iter_mut().filter(|s| s.set_in_scope == depth) {
                slot.status = match slot.status {
                    Status::Allocated => Status::Invalidated,
                    Status::Free => Status::FreeInvalidated,
                    other => other,
                };
            }
        }
        self.depth -= 1;
        Ok(())
    }

    /// Snapshot of every slot of the variable, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] for a key never seen.
    pub fn status_of(&self, key: &VariableKey) -> Result<Vec<(ValueNumber, Status)>> {
        Ok(self
            .known_slots(key)?
            .iter()
            .map(|s| (s.value.number(), s.status))
            .collect())
    }

    /// The instruction that defined a managed value, if confirmed.
    #[must_use]
    pub fn defined_by(&self, number: ValueNumber) -> Option<usize> {
        self.slots
            .iter()
            .flat_map(|(_, slots)| slots.iter())
            .find(|s| s.value.number() == number)
            .and_then(|s| s.set_by)
    }

    /// Human-readable names for every value handed out.
    ///
    /// Named keys keep their name. Other keys are called `m<Type>_<n>`, where `n`
    /// counts the distinct keys of the same simple type name in order of their first
    /// value number.
    #[must_use]
    pub fn local_names(&self) -> BTreeMap<ValueNumber, String> {
        let mut values: Vec<&SsaValue> = self
            .slots
            .iter()
            .flat_map(|(_, slots)| slots.iter().map(|s| &s.value))
            .chain(self.unmanaged.iter())
            .collect();
        values.sort_by_key(|v| v.number());

        let mut assigned: Vec<(&VariableKey, String)> = Vec::new();
        let mut per_type: HashMap<String, usize> = HashMap::new();
        let mut names = BTreeMap::new();

        for value in values {
            if let Some(name) = value.key().variable_name() {
                names.insert(value.number(), name.to_string());
                continue;
            }
            let existing = assigned
                .iter()
                .find(|(key, _)| *key == value.key())
                .map(|(_, name)| name.clone());
            let name = match existing {
                Some(name) => name,
                None => {
                    let simple = Self::simple_type_name(value.ty());
                    let counter = per_type.entry(simple.clone()).or_insert(0);
                    let name = format!("m{simple}_{counter}");
                    *counter += 1;
                    assigned.push((value.key(), name.clone()));
                    name
                }
            };
            names.insert(value.number(), name);
        }
        names
    }

    fn simple_type_name(ty: &TypeRef) -> String {
        let dims = ty.name.dimensions();
        let innermost = ty.name.innermost();
        let mut simple = innermost.simple_name().to_string();
        for _ in 0..dims {
            simple.push_str("Array");
        }
        simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeName;

    fn manager() -> Result<ValueManager> {
        let method = MethodRef::parse(
            TypeRef::application("Lshapes/Canvas"),
            "draw",
            "(Lshapes/Shape;)V",
        )?;
        ValueManager::new(&ParameterAccessor::from_signature(method, true))
    }

    #[test]
    fn test_parameters_are_allocated() -> Result<()> {
        let manager = manager()?;
        let shape = TypeRef::application("Lshapes/Shape");
        let key = VariableKey::by_name(&shape, "param_1");
        assert_eq!(manager.current(&key)?.number(), ValueNumber(2));
        assert_eq!(manager.next_number(), ValueNumber(3));
        assert!(!manager.needs_phi(&key)?);
        assert!(!manager.needs_allocation(&key));
        Ok(())
    }

    #[test]
    fn test_allocation_protocol() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::STRING;
        let key = VariableKey::by_name(&ty, "s");

        let value = manager.request_unallocated(&ty, key.clone())?;
        assert!(manager.needs_allocation(&key));
        assert!(matches!(
            manager.request_unallocated(&ty, key.clone()),
            Err(Error::PendingAllocation(_))
        ));
        manager.confirm_allocation(&value, 0)?;
        assert_eq!(manager.current(&key)?, value);
        assert_eq!(manager.defined_by(value.number()), Some(0));
        assert!(matches!(
            manager.confirm_allocation(&value, 1),
            Err(Error::AlreadyAllocated { .. })
        ));

        // Redefinition in the same scope replaces the value without a merge
        let second = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&second, 2)?;
        assert_eq!(manager.current(&key)?, second);
        assert!(!manager.needs_phi(&key)?);
        Ok(())
    }

    #[test]
    fn test_scope_then_phi() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::STRING;
        let key = VariableKey::by_name(&ty, "s");
        let outer = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&outer, 0)?;

        manager.enter_scope();
        let inner = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&inner, 1)?;
        assert_eq!(manager.super_value(&key)?, outer);
        manager.exit_scope()?;

        let invalidated = manager
            .status_of(&key)?
            .into_iter()
            .filter(|(_, status)| *status == Status::Invalidated)
            .count();
        assert_eq!(invalidated, 1);
        assert!(manager.needs_phi(&key)?);
        assert_eq!(manager.all_for_phi(&key)?, vec![outer.clone(), inner]);

        let merged = manager.request_free(&ty, key.clone())?;
        manager.confirm_phi(&merged, 2)?;
        assert!(!manager.needs_phi(&key)?);
        assert_eq!(manager.current(&key)?, merged);
        assert!(matches!(manager.confirm_phi(&outer, 3), Err(Error::NoPendingPhi(_))));
        Ok(())
    }

    #[test]
    fn test_current_sees_pending_phi() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let key = VariableKey::by_name(&ty, "loopvar");
        let before = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&before, 0)?;

        let header = manager.request_free(&ty, key.clone())?;
        assert_eq!(manager.current(&key)?, header);
        assert!(manager.needs_phi(&key)?);

        manager.confirm_phi(&header, 1)?;
        assert_eq!(manager.current(&key)?, header);
        Ok(())
    }

    #[test]
    fn test_current_with_only_free_value() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let key = VariableKey::by_name(&ty, "merged");
        let merged = manager.request_free(&ty, key.clone())?;
        assert_eq!(manager.current(&key)?, merged);
        assert!(!manager.needs_allocation(&key));
        Ok(())
    }

    #[test]
    fn test_inner_free_shadows_outer_allocation() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let key = VariableKey::by_name(&ty, "acc");
        let outer = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&outer, 0)?;

        manager.enter_scope();
        let inner = manager.request_free(&ty, key.clone())?;
        assert_eq!(manager.current(&key)?, inner);
        assert_eq!(manager.super_value(&key)?, outer);
        Ok(())
    }

    #[test]
    fn test_super_value_returns_outer_free() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let key = VariableKey::by_name(&ty, "acc");
        let outer = manager.request_free(&ty, key.clone())?;

        manager.enter_scope();
        let inner = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&inner, 0)?;
        assert_eq!(manager.current(&key)?, inner);
        assert_eq!(manager.super_value(&key)?, outer);

        manager.enter_scope();
        // Two levels down the enclosing scope is the one holding the allocation
        assert_eq!(manager.super_value(&key)?, inner);
        Ok(())
    }

    #[test]
    fn test_super_value_at_top_level() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let key = VariableKey::by_name(&ty, "top");
        manager.request_free(&ty, key.clone())?;
        assert!(matches!(manager.super_value(&key), Err(Error::NoCurrentValue(_))));
        Ok(())
    }

    #[test]
    fn test_type_lookup_independent_of_request_order() -> Result<()> {
        let ty = well_known::OBJECT;
        let named = VariableKey::by_name(&ty, "x");
        let weak = VariableKey::weakly_by_name(&ty, "x");
        let by_type = VariableKey::by_type(&ty);

        // The strong name comes first and owns the variable
        let mut manager = manager()?;
        let first = manager.request_unallocated(&ty, named.clone())?;
        manager.confirm_allocation(&first, 0)?;
        let second = manager.request_unallocated(&ty, weak.clone())?;
        manager.confirm_allocation(&second, 1)?;
        assert_eq!(manager.current(&by_type)?, second);
        assert_eq!(manager.current(&named)?, second);

        // The weak name comes first
        let mut manager = self::manager()?;
        let first = manager.request_unallocated(&ty, weak)?;
        manager.confirm_allocation(&first, 0)?;
        let second = manager.request_unallocated(&ty, named.clone())?;
        manager.confirm_allocation(&second, 1)?;
        assert_eq!(manager.current(&by_type)?, second);
        assert_eq!(manager.current(&named)?, second);
        Ok(())
    }

    #[test]
    fn test_exact_type_key_wins_over_weak_name() -> Result<()> {
        let mut manager = manager()?;
        let ty = well_known::OBJECT;
        let by_type = VariableKey::by_type(&ty);
        let weak = VariableKey::weakly_by_name(&ty, "x");

        let plain = manager.request_unallocated(&ty, by_type.clone())?;
        manager.confirm_allocation(&plain, 0)?;
        let named = manager.request_unallocated(&ty, VariableKey::by_name(&ty, "x"))?;
        manager.confirm_allocation(&named, 1)?;

        assert_eq!(manager.current(&by_type)?, plain);
        assert_eq!(manager.current(&weak)?, named);
        Ok(())
    }

    #[test]
    fn test_scope_errors() -> Result<()> {
        let mut manager = manager()?;
        assert_eq!(manager.exit_scope(), Err(Error::ScopeUnderflow));

        let ty = well_known::STRING;
        let key = VariableKey::by_type(&ty);
        manager.enter_scope();
        manager.enter_scope();
        let deep = manager.request_unallocated(&ty, key.clone())?;
        manager.confirm_allocation(&deep, 0)?;
        // Inner scope abandoned without exit_scope
        manager.depth -= 1;
        assert!(matches!(manager.exit_scope(), Err(Error::ScopeOrder(_))));
        Ok(())
    }

    #[test]
    fn test_unknown_keys() -> Result<()> {
        let mut manager = manager()?;
        let key = VariableKey::by_name(&well_known::INT, "missing");
        assert!(matches!(manager.current(&key), Err(Error::UnknownVariable(_))));
        assert!(matches!(manager.needs_phi(&key), Err(Error::UnknownVariable(_))));
        assert!(manager.invalidate(&key).is_err());
        assert!(!manager.is_seen(&key));
        assert!(manager.needs_allocation(&key));
        Ok(())
    }

    #[test]
    fn test_local_names() -> Result<()> {
        let mut manager = manager()?;
        let list = TypeRef::application("Ljava/util/List");
        let a = manager.unmanaged(&list, VariableKey::unique())?;
        let b = manager.unmanaged(&list, VariableKey::unique())?;
        let array = manager.unmanaged(
            &TypeRef::new(
                crate::types::ClassLoaderRef::PRIMORDIAL,
                TypeName::from_static("[I"),
            ),
            VariableKey::unique(),
        )?;
        let names = manager.local_names();
        assert_eq!(names.get(&ValueNumber(1)).map(String::as_str), Some("this"));
        assert_eq!(names.get(&ValueNumber(2)).map(String::as_str), Some("param_1"));
        assert_eq!(names.get(&a.number()).map(String::as_str), Some("mList_0"));
        assert_eq!(names.get(&b.number()).map(String::as_str), Some("mList_1"));
        assert_eq!(names.get(&array.number()).map(String::as_str), Some("mIArray_0"));
        Ok(())
    }
}
