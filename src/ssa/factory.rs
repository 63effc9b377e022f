//! Type-checked construction of instructions.
//!
//! [`TypedInstructionFactory`] is the only way synthetic bodies create instructions.
//! Every entry point re-derives the types an instruction expects from the referenced
//! method, field or array and rejects operands that do not fit, so a synthesized body is
//! well typed by construction. On success the defined values are marked assigned, which
//! enforces the single-assignment property across the whole body.

use tracing::trace;

use crate::{
    hierarchy::ClassHierarchy,
    ssa::{
        BranchOp, CallSiteRef, Dispatch, Instruction, NewSite, ParameterAccessor, SsaValue,
    },
    types::{well_known, FieldRef, MethodRef, TypeRef},
    Error, Result,
};

/// Builds instructions after checking their operand types against the hierarchy.
#[derive(Clone, Copy)]
pub struct TypedInstructionFactory<'h> {
    hierarchy: &'h dyn ClassHierarchy,
}

impl<'h> TypedInstructionFactory<'h> {
    /// Creates a factory checking against `hierarchy`.
    #[must_use]
    pub fn new(hierarchy: &'h dyn ClassHierarchy) -> Self {
        Self { hierarchy }
    }

    /// The hierarchy used for checks.
    #[must_use]
    pub fn hierarchy(&self) -> &'h dyn ClassHierarchy {
        self.hierarchy
    }

    fn expect_assignable(&self, found: &TypeRef, expected: &TypeRef, what: impl FnOnce() -> String) -> Result<()> {
        if ParameterAccessor::is_assignable(found, expected, self.hierarchy) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: expected.clone(),
                found: found.clone(),
                what: what(),
            })
        }
    }

    fn expect_same_owner<'v>(values: impl IntoIterator<Item = &'v SsaValue>) -> Result<()> {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Ok(());
        };
        for value in values {
            if !first.same_owner(value) {
                return Err(Error::ScopeMismatch(format!(
                    "{first} belongs to {} but {value} belongs to {}",
                    first.owner(),
                    value.owner()
                )));
            }
        }
        Ok(())
    }

    fn target_accessor(&self, target: &MethodRef, dispatch: Dispatch) -> ParameterAccessor {
        match ParameterAccessor::resolve(target.clone(), self.hierarchy) {
            Ok(accessor) => accessor,
            Err(error) => {
                trace!(%target, %error, "falling back to the dispatch kind for the receiver");
                ParameterAccessor::from_signature(target.clone(), dispatch.has_receiver())
            }
        }
    }

    fn check_call(
        &self,
        target: &MethodRef,
        dispatch: Dispatch,
        params: &[SsaValue],
        exception: &SsaValue,
    ) -> Result<()> {
        let accessor = self.target_accessor(target, dispatch);
        if accessor.has_receiver() != dispatch.has_receiver() {
            return Err(Error::InvalidArgument(format!(
                "{} can not be called with {}",
                target,
                dispatch.mnemonic()
            )));
        }

        let expected = accessor.number_of_parameters() + usize::from(accessor.has_receiver());
        if params.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "{target} takes {expected} operands, {} given",
                params.len()
            )));
        }

        let mut operands = params.iter();
        if accessor.has_receiver() {
            if let Some(receiver) = operands.next() {
                self.expect_assignable(receiver.ty(), &target.declaring, || {
                    format!("receiver of {target}")
                })?;
            }
        }
        for (index, value) in operands.enumerate() {
            let declared = accessor.parameter_type(index + 1)?;
            self.expect_assignable(value.ty(), &declared, || {
                format!("argument {} of {target}", index + 1)
            })?;
        }

        self.expect_assignable(exception.ty(), &well_known::THROWABLE, || {
            format!("exception of {target}")
        })
    }

    /// A call whose return value is stored in `result`.
    ///
    /// `params` starts with the receiver when `dispatch` has one.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a wrong arity, a dispatch kind that contradicts
    ///   the target's staticness, or a result that is also an operand
    /// - [`Error::TypeMismatch`] for an operand or result that does not fit
    /// - [`Error::ScopeMismatch`] for operands of another method
    /// - [`Error::AlreadyAssigned`] when `result` or `exception` is already defined
    pub fn invoke(
        &self,
        pc: usize,
        result: &SsaValue,
        target: &MethodRef,
        dispatch: Dispatch,
        params: &[SsaValue],
        exception: &SsaValue,
    ) -> Result<Instruction> {
        if !target.returns_value() {
            return Err(Error::NoReturn(target.clone()));
        }
        if params.iter().any(|p| p.number() == result.number()) {
            return Err(Error::InvalidArgument(format!(
                "{result} is both result and operand of {target}"
            )));
        }
        Self::expect_same_owner(std::iter::once(result).chain(params).chain([exception]))?;
        self.check_call(target, dispatch, params, exception)?;
        self.expect_assignable(&target.return_type(), result.ty(), || {
            format!("result of {target}")
        })?;

        result.mark_assigned()?;
        exception.mark_assigned()?;
        Ok(Instruction::Invoke {
            result: Some(result.number()),
            exception: exception.number(),
            site: CallSiteRef::new(
                pc,
                target.clone(),
                dispatch,
                params.iter().map(SsaValue::number).collect(),
            ),
        })
    }

    /// A call whose return value, if any, is discarded.
    ///
    /// # Errors
    ///
    /// Same as [`TypedInstructionFactory::invoke`], without the result checks.
    pub fn invoke_void(
        &self,
        pc: usize,
        target: &MethodRef,
        dispatch: Dispatch,
        params: &[SsaValue],
        exception: &SsaValue,
    ) -> Result<Instruction> {
        Self::expect_same_owner(params.iter().chain([exception]))?;
        self.check_call(target, dispatch, params, exception)?;
        exception.mark_assigned()?;
        Ok(Instruction::Invoke {
            result: None,
            exception: exception.number(),
            site: CallSiteRef::new(
                pc,
                target.clone(),
                dispatch,
                params.iter().map(SsaValue::number).collect(),
            ),
        })
    }

    /// Reads an instance field of `object` into `result`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`], [`Error::ScopeMismatch`] or [`Error::AlreadyAssigned`].
    pub fn get_field(&self, result: &SsaValue, object: &SsaValue, field: &FieldRef) -> Result<Instruction> {
        Self::expect_same_owner([result, object])?;
        self.expect_assignable(object.ty(), &field.declaring, || format!("object of {field}"))?;
        self.expect_assignable(&field.field_type_ref(), result.ty(), || format!("result of {field}"))?;
        result.mark_assigned()?;
        Ok(Instruction::GetField {
            result: result.number(),
            object: Some(object.number()),
            field: field.clone(),
        })
    }

    /// Reads a static field into `result`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] or [`Error::AlreadyAssigned`].
    pub fn get_static(&self, result: &SsaValue, field: &FieldRef) -> Result<Instruction> {
        self.expect_assignable(&field.field_type_ref(), result.ty(), || format!("result of {field}"))?;
        result.mark_assigned()?;
        Ok(Instruction::GetField {
            result: result.number(),
            object: None,
            field: field.clone(),
        })
    }

    /// Writes `value` into an instance field of `object`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] or [`Error::ScopeMismatch`].
    pub fn put_field(&self, object: &SsaValue, value: &SsaValue, field: &FieldRef) -> Result<Instruction> {
        Self::expect_same_owner([object, value])?;
        self.expect_assignable(object.ty(), &field.declaring, || format!("object of {field}"))?;
        self.expect_assignable(value.ty(), &field.field_type_ref(), || format!("value of {field}"))?;
        Ok(Instruction::PutField {
            object: Some(object.number()),
            value: value.number(),
            field: field.clone(),
        })
    }

    /// Writes `value` into a static field.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`].
    pub fn put_static(&self, value: &SsaValue, field: &FieldRef) -> Result<Instruction> {
        self.expect_assignable(value.ty(), &field.field_type_ref(), || format!("value of {field}"))?;
        Ok(Instruction::PutField {
            object: None,
            value: value.number(),
            field: field.clone(),
        })
    }

    /// Allocates an object of type `ty` into `result`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for primitive or array types
    /// - [`Error::TypeMismatch`] when `ty` does not fit `result`
    /// - [`Error::AlreadyAssigned`]
    pub fn new_object(&self, pc: usize, result: &SsaValue, ty: &TypeRef) -> Result<Instruction> {
        if !ty.is_reference() || ty.is_array() {
            return Err(Error::InvalidArgument(format!(
                "new expects a class type, got {ty}"
            )));
        }
        self.expect_assignable(ty, result.ty(), || format!("allocation of {ty}"))?;
        result.mark_assigned()?;
        Ok(Instruction::New {
            result: result.number(),
            site: NewSite { pc, ty: ty.clone() },
            sizes: Vec::new(),
        })
    }

    /// Allocates an array of type `ty` with one length per leading dimension.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a non-array type or a bad number of lengths
    /// - [`Error::TypeMismatch`] for a non-`int` length or a result that does not fit
    /// - [`Error::ScopeMismatch`] and [`Error::AlreadyAssigned`]
    pub fn new_array(
        &self,
        pc: usize,
        result: &SsaValue,
        ty: &TypeRef,
        sizes: &[SsaValue],
    ) -> Result<Instruction> {
        let dims = ty.name.dimensions();
        if dims == 0 || sizes.is_empty() || sizes.len() > dims {
            return Err(Error::InvalidArgument(format!(
                "{} lengths given for {ty}",
                sizes.len()
            )));
        }
        Self::expect_same_owner(std::iter::once(result).chain(sizes))?;
        for size in sizes {
            self.expect_assignable(size.ty(), &well_known::INT, || format!("length of {ty}"))?;
        }
        self.expect_assignable(ty, result.ty(), || format!("allocation of {ty}"))?;
        result.mark_assigned()?;
        Ok(Instruction::New {
            result: result.number(),
            site: NewSite { pc, ty: ty.clone() },
            sizes: sizes.iter().map(SsaValue::number).collect(),
        })
    }

    fn element_of(array: &SsaValue) -> Result<TypeRef> {
        array.ty().element_type().ok_or_else(|| {
            Error::InvalidArgument(format!("{array} is not an array"))
        })
    }

    /// Loads `array[index]` into `result`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when `array` is not an array
    /// - [`Error::TypeMismatch`], [`Error::ScopeMismatch`], [`Error::AlreadyAssigned`]
    pub fn array_load(&self, result: &SsaValue, array: &SsaValue, index: &SsaValue) -> Result<Instruction> {
        let element = Self::element_of(array)?;
        Self::expect_same_owner([result, array, index])?;
        self.expect_assignable(index.ty(), &well_known::INT, || format!("index into {array}"))?;
        self.expect_assignable(&element, result.ty(), || format!("element of {array}"))?;
        result.mark_assigned()?;
        Ok(Instruction::ArrayLoad {
            result: result.number(),
            array: array.number(),
            index: index.number(),
            element,
        })
    }

    /// Stores `value` into `array[index]`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when `array` is not an array
    /// - [`Error::TypeMismatch`] or [`Error::ScopeMismatch`]
    pub fn array_store(&self, array: &SsaValue, index: &SsaValue, value: &SsaValue) -> Result<Instruction> {
        let element = Self::element_of(array)?;
        Self::expect_same_owner([array, index, value])?;
        self.expect_assignable(index.ty(), &well_known::INT, || format!("index into {array}"))?;
        self.expect_assignable(value.ty(), &element, || format!("element of {array}"))?;
        Ok(Instruction::ArrayStore {
            array: array.number(),
            index: index.number(),
            value: value.number(),
            element,
        })
    }

    /// Reads the length of `array` into `result`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when `array` is not an array
    /// - [`Error::TypeMismatch`], [`Error::ScopeMismatch`], [`Error::AlreadyAssigned`]
    pub fn array_length(&self, result: &SsaValue, array: &SsaValue) -> Result<Instruction> {
        Self::element_of(array)?;
        Self::expect_same_owner([result, array])?;
        self.expect_assignable(&well_known::INT, result.ty(), || format!("length of {array}"))?;
        result.mark_assigned()?;
        Ok(Instruction::ArrayLength {
            result: result.number(),
            array: array.number(),
        })
    }

    /// Casts `value` to `result`'s type.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when either side is primitive
    /// - [`Error::ScopeMismatch`] or [`Error::AlreadyAssigned`]
    pub fn check_cast(&self, result: &SsaValue, value: &SsaValue) -> Result<Instruction> {
        if value.ty().is_primitive() || result.ty().is_primitive() {
            return Err(Error::InvalidArgument(format!(
                "can not cast {value} to {}",
                result.ty()
            )));
        }
        Self::expect_same_owner([result, value])?;
        result.mark_assigned()?;
        Ok(Instruction::CheckCast {
            result: result.number(),
            value: value.number(),
            ty: result.ty().clone(),
        })
    }

    /// Loads the class literal of `token` into `result`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] when `result` can not hold a `java.lang.Class`, or
    /// [`Error::AlreadyAssigned`].
    pub fn load_metadata(&self, result: &SsaValue, token: &TypeRef) -> Result<Instruction> {
        self.expect_assignable(&well_known::CLASS, result.ty(), || format!("class literal {token}"))?;
        result.mark_assigned()?;
        Ok(Instruction::LoadMetadata {
            result: result.number(),
            token: token.clone(),
        })
    }

    /// Returns `value` from its owning method.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReturn`] when the owner returns `void`
    /// - [`Error::TypeMismatch`] when `value` does not fit the return type
    pub fn return_value(&self, value: &SsaValue) -> Result<Instruction> {
        let owner = value.owner();
        if !owner.returns_value() {
            return Err(Error::NoReturn(owner.clone()));
        }
        self.expect_assignable(value.ty(), &owner.return_type(), || {
            format!("return value of {owner}")
        })?;
        Ok(Instruction::Return {
            value: Some(value.number()),
        })
    }

    /// A return without value.
    #[must_use]
    pub fn return_void(&self) -> Instruction {
        Instruction::Return { value: None }
    }

    /// Throws `exception`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] when `exception` is not a `Throwable`.
    pub fn throw(&self, exception: &SsaValue) -> Result<Instruction> {
        self.expect_assignable(exception.ty(), &well_known::THROWABLE, || {
            format!("thrown value {exception}")
        })?;
        Ok(Instruction::Throw {
            exception: exception.number(),
        })
    }

    /// Merges `operands` into `result`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty operand list or phi-to-self
    /// - [`Error::ScopeMismatch`], [`Error::TypeMismatch`], [`Error::AlreadyAssigned`]
    pub fn phi(&self, result: &SsaValue, operands: &[SsaValue]) -> Result<Instruction> {
        if operands.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "phi for {result} has no operands"
            )));
        }
        if operands.iter().any(|o| o.number() == result.number()) {
            return Err(Error::InvalidArgument(format!("phi for {result} uses itself")));
        }
        Self::expect_same_owner(std::iter::once(result).chain(operands))?;
        for operand in operands {
            self.expect_assignable(operand.ty(), result.ty(), || format!("phi operand {operand}"))?;
        }
        result.mark_assigned()?;
        Ok(Instruction::Phi {
            result: result.number(),
            operands: operands.iter().map(SsaValue::number).collect(),
        })
    }

    /// Jumps to instruction `target`.
    #[must_use]
    pub fn goto(&self, target: usize) -> Instruction {
        Instruction::Goto { target }
    }

    /// Jumps to instruction `target` when `lhs op rhs` holds.
    ///
    /// # Errors
    ///
    /// [`Error::ScopeMismatch`] when the operands belong to different methods.
    pub fn branch(&self, op: BranchOp, lhs: &SsaValue, rhs: &SsaValue, target: usize) -> Result<Instruction> {
        Self::expect_same_owner([lhs, rhs])?;
        Ok(Instruction::Branch {
            op,
            lhs: lhs.number(),
            rhs: rhs.number(),
            target,
        })
    }
}
