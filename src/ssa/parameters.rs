//! Parameter numbering of a method.
//!
//! Every synthetic body uses the same value numbering for its incoming values:
//!
//! | method kind | receiver | parameter `i` (1-based) | first free number |
//! |-------------|----------|-------------------------|-------------------|
//! | static      | none     | `v{i}`                  | `v{n + 2}`        |
//! | instance    | `v1`     | `v{i + 1}`              | `v{n + 2}`        |
//!
//! [`ParameterAccessor`] hands out typed [`SsaValue`]s for those numbers and matches
//! values against the parameters of other methods when building calls.

use tracing::warn;

use crate::{
    hierarchy::{ClassHierarchy, MethodInfo},
    ssa::{SsaValue, ValueNumber, VariableKey},
    types::{MethodRef, TypeRef},
    Error, Result,
};

/// Creates values for parameters no existing value can fill.
///
/// Used by [`ParameterAccessor::connect_through`] as the last resort, e.g. to allocate a
/// fresh object of the parameter type.
pub trait Instantiator {
    /// Produces a value of type `ty`, or `None` if it can not.
    fn instantiate(&self, ty: &TypeRef) -> Option<SsaValue>;
}

/// Value numbers and types of a method's receiver and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAccessor {
    method: MethodRef,
    has_receiver: bool,
}

impl ParameterAccessor {
    /// Builds an accessor from the reference alone.
    ///
    /// The caller states whether the method has a receiver; nothing is looked up.
    #[must_use]
    pub fn from_signature(method: MethodRef, has_receiver: bool) -> Self {
        Self {
            method,
            has_receiver,
        }
    }

    /// Builds an accessor by asking the hierarchy whether the method is static.
    ///
    /// # Errors
    ///
    /// - [`Error::MethodNotFound`] when the hierarchy knows no target
    /// - [`Error::ConflictingStaticness`] when the possible targets disagree
    pub fn resolve(method: MethodRef, hierarchy: &dyn ClassHierarchy) -> Result<Self> {
        let targets = hierarchy.possible_targets(&method);
        let Some(first) = targets.first() else {
            return Err(Error::MethodNotFound(method));
        };
        let is_static = first.is_static();
        if targets.iter().any(|target| target.is_static() != is_static) {
            return Err(Error::ConflictingStaticness(method));
        }
        Ok(Self {
            method,
            has_receiver: !is_static,
        })
    }

    /// Builds an accessor for a resolved declaration.
    #[must_use]
    pub fn for_method_info(info: &MethodInfo) -> Self {
        Self {
            method: info.reference.clone(),
            has_receiver: !info.is_static(),
        }
    }

    /// The described method.
    #[must_use]
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    /// Returns `true` for instance methods and constructors.
    #[must_use]
    pub fn has_receiver(&self) -> bool {
        self.has_receiver
    }

    /// Number of declared parameters, receiver excluded.
    #[must_use]
    pub fn number_of_parameters(&self) -> usize {
        self.method.parameter_count()
    }

    /// The first value number not taken by the receiver or a parameter.
    #[must_use]
    pub fn first_after(&self) -> ValueNumber {
        ValueNumber(Self::as_u32(self.number_of_parameters()) + 2)
    }

    fn as_u32(count: usize) -> u32 {
        u32::try_from(count).unwrap_or(u32::MAX - 2)
    }

    /// The receiver, typed as the declaring class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoReceiver`] for static methods.
    pub fn receiver(&self) -> Result<SsaValue> {
        if !self.has_receiver {
            return Err(Error::NoReceiver(self.method.clone()));
        }
        SsaValue::preassigned(
            ValueNumber(1),
            self.method.declaring.clone(),
            self.method.clone(),
            VariableKey::by_name(&self.method.declaring, "this"),
        )
    }

    /// The receiver typed as a subclass of the declaring class.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReceiver`] for static methods
    /// - [`Error::TypeMismatch`] when `ty` is not assignable to the declaring class
    pub fn receiver_as(&self, ty: &TypeRef, hierarchy: &dyn ClassHierarchy) -> Result<SsaValue> {
        let receiver = self.receiver()?;
        if !Self::is_assignable(ty, &self.method.declaring, hierarchy) {
            return Err(Error::TypeMismatch {
                expected: self.method.declaring.clone(),
                found: ty.clone(),
                what: format!("receiver of {}", self.method),
            });
        }
        SsaValue::preassigned(
            receiver.number(),
            ty.clone(),
            self.method.clone(),
            receiver.key().clone(),
        )
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let count = self.number_of_parameters();
        if index == 0 || index > count {
            return Err(Error::ParameterOutOfRange {
                index,
                count,
                method: self.method.clone(),
            });
        }
        Ok(())
    }

    /// Value number of the 1-based declared parameter `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterOutOfRange`] for 0 or an index past the last parameter.
    pub fn parameter_number(&self, index: usize) -> Result<ValueNumber> {
        self.check_index(index)?;
        let offset = u32::from(self.has_receiver);
        Ok(ValueNumber(Self::as_u32(index) + offset))
    }

    /// Declared type of the 1-based parameter `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterOutOfRange`] for 0 or an index past the last parameter.
    pub fn parameter_type(&self, index: usize) -> Result<TypeRef> {
        self.check_index(index)?;
        self.method
            .parameter_type(index - 1)
            .ok_or_else(|| internal_error!("parameter {} of {} vanished", index, self.method))
    }

    /// The 1-based declared parameter `index` as a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterOutOfRange`] for 0 or an index past the last parameter.
    pub fn parameter(&self, index: usize) -> Result<SsaValue> {
        let number = self.parameter_number(index)?;
        let ty = self.parameter_type(index)?;
        let key = VariableKey::by_name(&ty, format!("param_{index}"));
        SsaValue::preassigned(number, ty, self.method.clone(), key)
    }

    /// All declared parameters in order, receiver excluded.
    ///
    /// # Errors
    ///
    /// Fails only if a parameter has type `void`, which a parsed descriptor never has.
    pub fn all(&self) -> Result<Vec<SsaValue>> {
        (1..=self.number_of_parameters())
            .map(|index| self.parameter(index))
            .collect()
    }

    /// The receiver (if any) followed by all declared parameters.
    ///
    /// # Errors
    ///
    /// See [`ParameterAccessor::all`].
    pub fn all_with_receiver(&self) -> Result<Vec<SsaValue>> {
        let mut values = Vec::with_capacity(self.number_of_parameters() + 1);
        if self.has_receiver {
            values.push(self.receiver()?);
        }
        values.extend(self.all()?);
        Ok(values)
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeRef {
        self.method.return_type()
    }

    /// Returns `true` unless the method returns `void`.
    #[must_use]
    pub fn has_return(&self) -> bool {
        self.method.returns_value()
    }

    /// A fresh value of the return type to be defined by the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoReturn`] for void methods.
    pub fn make_return(&self, number: ValueNumber) -> Result<SsaValue> {
        if !self.has_return() {
            return Err(Error::NoReturn(self.method.clone()));
        }
        let ty = self.return_type();
        let key = VariableKey::by_name(&ty, "return");
        SsaValue::new(number, ty, self.method.clone(), key)
    }

    /// Like [`ParameterAccessor::make_return`] but typed as a subtype of the return type.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReturn`] for void methods
    /// - [`Error::TypeMismatch`] when `ty` is not assignable to the return type
    pub fn make_return_checked(
        &self,
        number: ValueNumber,
        ty: &TypeRef,
        hierarchy: &dyn ClassHierarchy,
    ) -> Result<SsaValue> {
        if !self.has_return() {
            return Err(Error::NoReturn(self.method.clone()));
        }
        let expected = self.return_type();
        if !Self::is_assignable(ty, &expected, hierarchy) {
            return Err(Error::TypeMismatch {
                expected,
                found: ty.clone(),
                what: format!("return value of {}", self.method),
            });
        }
        let key = VariableKey::by_name(ty, "return");
        SsaValue::new(number, ty.clone(), self.method.clone(), key)
    }

    /// The receiver or first parameter whose type is exactly `ty`.
    #[must_use]
    pub fn first_of(&self, ty: &TypeRef) -> Option<SsaValue> {
        self.all_with_receiver()
            .ok()?
            .into_iter()
            .find(|value| value.ty().name == ty.name)
    }

    /// The receiver or first parameter assignable to `ty`.
    #[must_use]
    pub fn first_extends(&self, ty: &TypeRef, hierarchy: &dyn ClassHierarchy) -> Option<SsaValue> {
        self.all_with_receiver()
            .ok()?
            .into_iter()
            .find(|value| Self::is_assignable(value.ty(), ty, hierarchy))
    }

    /// Every receiver or parameter value assignable to `ty`.
    #[must_use]
    pub fn all_extend(&self, ty: &TypeRef, hierarchy: &dyn ClassHierarchy) -> Vec<SsaValue> {
        self.all_with_receiver()
            .unwrap_or_default()
            .into_iter()
            .filter(|value| Self::is_assignable(value.ty(), ty, hierarchy))
            .collect()
    }

    fn check_arguments(&self, args: &[SsaValue], hierarchy: Option<&dyn ClassHierarchy>) -> Result<()> {
        if args.len() != self.number_of_parameters() {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                self.method,
                self.number_of_parameters(),
                args.len()
            )));
        }
        let Some(hierarchy) = hierarchy else {
            return Ok(());
        };
        for (position, arg) in args.iter().enumerate() {
            let expected = self.parameter_type(position + 1)?;
            if !Self::is_assignable(arg.ty(), &expected, hierarchy) {
                return Err(Error::TypeMismatch {
                    expected,
                    found: arg.ty().clone(),
                    what: format!("argument {} of {}", position + 1, self.method),
                });
            }
        }
        Ok(())
    }

    /// Operand list for calling this (static) method with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when the method has a receiver or the arity differs
    /// - [`Error::TypeMismatch`] when a hierarchy is given and an argument does not fit
    pub fn for_invoke_static(
        &self,
        args: &[SsaValue],
        hierarchy: Option<&dyn ClassHierarchy>,
    ) -> Result<Vec<ValueNumber>> {
        if self.has_receiver {
            return Err(Error::InvalidArgument(format!(
                "{} is not static",
                self.method
            )));
        }
        self.check_arguments(args, hierarchy)?;
        Ok(args.iter().map(SsaValue::number).collect())
    }

    /// Operand list for calling this (instance) method on `receiver` with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReceiver`] when the method is static
    /// - [`Error::InvalidArgument`] when the arity differs
    /// - [`Error::TypeMismatch`] when a hierarchy is given and an operand does not fit
    pub fn for_invoke_virtual(
        &self,
        receiver: &SsaValue,
        args: &[SsaValue],
        hierarchy: Option<&dyn ClassHierarchy>,
    ) -> Result<Vec<ValueNumber>> {
        if !self.has_receiver {
            return Err(Error::NoReceiver(self.method.clone()));
        }
        if let Some(hierarchy) = hierarchy {
            if !Self::is_assignable(receiver.ty(), &self.method.declaring, hierarchy) {
                return Err(Error::TypeMismatch {
                    expected: self.method.declaring.clone(),
                    found: receiver.ty().clone(),
                    what: format!("receiver of {}", self.method),
                });
            }
        }
        self.check_arguments(args, hierarchy)?;
        Ok(std::iter::once(receiver.number())
            .chain(args.iter().map(SsaValue::number))
            .collect())
    }

    /// Chooses a value for every receiver and parameter slot of `callee`.
    ///
    /// For each slot, in order: an exact type match among `overrides`, among this
    /// method's receiver and parameters, among `defaults`; then an assignable match in
    /// the same order; then the `instantiator`. If a slot stays empty the whole
    /// connection fails with `None`.
    #[must_use]
    pub fn connect_through(
        &self,
        callee: &ParameterAccessor,
        overrides: &[SsaValue],
        defaults: &[SsaValue],
        hierarchy: &dyn ClassHierarchy,
        instantiator: Option<&dyn Instantiator>,
    ) -> Option<Vec<SsaValue>> {
        let own = self.all_with_receiver().unwrap_or_default();
        let pools = [overrides, own.as_slice(), defaults];

        let mut slots = Vec::with_capacity(callee.number_of_parameters() + 1);
        if callee.has_receiver {
            slots.push(callee.method.declaring.clone());
        }
        slots.extend(callee.method.parameter_types());

        let mut connected = Vec::with_capacity(slots.len());
        for (position, expected) in slots.iter().enumerate() {
            let exact = pools
                .iter()
                .flat_map(|pool| pool.iter())
                .find(|value| value.ty().name == expected.name);
            let assignable = || {
                pools
                    .iter()
                    .flat_map(|pool| pool.iter())
                    .find(|value| Self::is_assignable(value.ty(), expected, hierarchy))
            };
            let chosen = exact
                .or_else(assignable)
                .cloned()
                .or_else(|| instantiator.and_then(|inst| inst.instantiate(expected)));

            match chosen {
                Some(value) => connected.push(value),
                None => {
                    warn!(
                        callee = %callee.method,
                        position,
                        expected = %expected,
                        "no value to pass while connecting through"
                    );
                    return None;
                }
            }
        }
        Some(connected)
    }

    /// Assignability with the leniency synthetic bodies need.
    ///
    /// Equal names and primitive widening are accepted; primitives and references never
    /// mix; a reference type the hierarchy can not resolve is accepted as a source but
    /// rejected as a target.
    #[must_use]
    pub fn is_assignable(from: &TypeRef, to: &TypeRef, hierarchy: &dyn ClassHierarchy) -> bool {
        if from.name == to.name {
            return true;
        }
        match (from.primitive(), to.primitive()) {
            (Some(a), Some(b)) => return a.widens_to(b),
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if hierarchy.resolve(from).is_none() {
            return true;
        }
        if hierarchy.resolve(to).is_none() {
            return false;
        }
        hierarchy.is_assignable(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::fixtures::shapes, types::well_known};

    fn three_ints(declaring: &str) -> Result<MethodRef> {
        MethodRef::parse(TypeRef::application(declaring), "sum", "(III)I")
    }

    #[test]
    fn test_static_numbering() -> Result<()> {
        let accessor = ParameterAccessor::from_signature(three_ints("Lshapes/Util")?, false);
        let numbers: Vec<u32> = accessor.all()?.iter().map(|v| v.number().get()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(accessor.first_after(), ValueNumber(5));
        assert!(matches!(accessor.receiver(), Err(Error::NoReceiver(_))));
        Ok(())
    }

    #[test]
    fn test_instance_numbering() -> Result<()> {
        let accessor = ParameterAccessor::from_signature(three_ints("Lshapes/Util")?, true);
        assert_eq!(accessor.receiver()?.number(), ValueNumber(1));
        let numbers: Vec<u32> = accessor.all()?.iter().map(|v| v.number().get()).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
        assert_eq!(accessor.first_after(), ValueNumber(5));
        assert!(matches!(
            accessor.parameter(0),
            Err(Error::ParameterOutOfRange { index: 0, count: 3, .. })
        ));
        assert!(accessor.parameter(4).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_numbering_matches_signature() -> Result<()> {
        let hierarchy = shapes();
        let area = MethodRef::parse(TypeRef::application("Lshapes/Square"), "area", "()D")?;
        let resolved = ParameterAccessor::resolve(area.clone(), &hierarchy)?;
        assert_eq!(resolved, ParameterAccessor::from_signature(area, true));

        let origin = MethodRef::parse(
            TypeRef::application("Lshapes/Square"),
            "origin",
            "()Lshapes/Square;",
        )?;
        assert!(!ParameterAccessor::resolve(origin, &hierarchy)?.has_receiver());

        let missing = MethodRef::parse(TypeRef::application("Lshapes/Square"), "nope", "()V")?;
        assert!(matches!(
            ParameterAccessor::resolve(missing, &hierarchy),
            Err(Error::MethodNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_return_values() -> Result<()> {
        let hierarchy = shapes();
        let factory = MethodRef::parse(
            TypeRef::application("Lshapes/Factory"),
            "make",
            "()Lshapes/Shape;",
        )?;
        let accessor = ParameterAccessor::from_signature(factory, false);
        assert!(accessor.has_return());
        let ret = accessor.make_return_checked(
            ValueNumber(4),
            &TypeRef::application("Lshapes/Square"),
            &hierarchy,
        )?;
        assert!(!ret.is_assigned());
        assert!(accessor
            .make_return_checked(ValueNumber(4), &well_known::INT, &hierarchy)
            .is_err());

        let void = ParameterAccessor::from_signature(well_known::system_arraycopy(), false);
        assert!(matches!(void.make_return(ValueNumber(3)), Err(Error::NoReturn(_))));
        Ok(())
    }

    #[test]
    fn test_lenient_assignability() {
        let hierarchy = shapes();
        let missing = TypeRef::application("Lmissing/Type");
        assert!(ParameterAccessor::is_assignable(&missing, &well_known::STRING, &hierarchy));
        assert!(!ParameterAccessor::is_assignable(&well_known::STRING, &missing, &hierarchy));
        assert!(ParameterAccessor::is_assignable(&well_known::SHORT, &well_known::INT, &hierarchy));
        assert!(!ParameterAccessor::is_assignable(&well_known::INT, &well_known::STRING, &hierarchy));
    }

    #[test]
    fn test_connect_through_prefers_exact_matches() -> Result<()> {
        let hierarchy = shapes();
        let caller = ParameterAccessor::from_signature(
            MethodRef::parse(
                TypeRef::application("Lshapes/Canvas"),
                "draw",
                "(Lshapes/Square;Lshapes/Shape;)V",
            )?,
            false,
        );
        let callee = ParameterAccessor::from_signature(
            MethodRef::parse(
                TypeRef::application("Lshapes/Canvas"),
                "paint",
                "(Lshapes/Shape;)V",
            )?,
            false,
        );
        let connected = caller
            .connect_through(&callee, &[], &[], &hierarchy, None)
            .ok_or_else(|| internal_error!("connect_through must succeed"))?;
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].number(), ValueNumber(2));

        let needs_int = ParameterAccessor::from_signature(
            MethodRef::parse(TypeRef::application("Lshapes/Canvas"), "scale", "(I)V")?,
            false,
        );
        assert!(caller
            .connect_through(&needs_int, &[], &[], &hierarchy, None)
            .is_none());
        Ok(())
    }

    #[test]
    fn test_for_invoke_checks_arity() -> Result<()> {
        let hierarchy = shapes();
        let callee = ParameterAccessor::from_signature(well_known::system_arraycopy(), false);
        let caller = ParameterAccessor::from_signature(
            MethodRef::parse(
                TypeRef::application("Lshapes/Canvas"),
                "copy",
                "([I[I)V",
            )?,
            false,
        );
        let args = caller.all()?;
        let operands = callee.for_invoke_static(&args, Some(&hierarchy))?;
        assert_eq!(operands, vec![ValueNumber(1), ValueNumber(2)]);
        assert!(callee.for_invoke_static(&args[..1], None).is_err());
        assert!(callee
            .for_invoke_virtual(&args[0], &args[1..], None)
            .is_err());
        Ok(())
    }
}
