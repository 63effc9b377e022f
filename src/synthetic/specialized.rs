//! Incremental construction of one synthetic body.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    context::CgNode,
    hierarchy::ClassHierarchy,
    ssa::{
        Constant, Dispatch, Instruction, ParameterAccessor, SsaValue, TypedInstructionFactory,
        ValueManager, ValueNumber, VariableKey,
    },
    summary::MethodSummary,
    synthetic::SyntheticIr,
    types::{well_known, MethodRef, PrimitiveType, TypeRef},
    Result,
};

/// A body under construction for one (method, context) pair.
///
/// Wraps a [`ValueManager`] and a [`TypedInstructionFactory`] and keeps the
/// instruction list together with the indices of allocations and calls. Every value it
/// hands out is owned by the node's method. Types allocated through
/// [`SpecializedMethod::allocate`] are remembered so each type is allocated at most
/// once per body.
pub struct SpecializedMethod<'h> {
    node: CgNode,
    accessor: ParameterAccessor,
    values: ValueManager,
    factory: TypedInstructionFactory<'h>,
    instructions: Vec<Instruction>,
    allocations: Vec<usize>,
    calls: Vec<usize>,
    types_allocated: BTreeSet<TypeRef>,
    constants: BTreeMap<ValueNumber, Constant>,
    constant_values: BTreeMap<(TypeRef, Constant), SsaValue>,
}

impl<'h> SpecializedMethod<'h> {
    /// Starts an empty body numbered after the accessor's parameters.
    ///
    /// # Errors
    ///
    /// Fails if the accessor yields a `void` parameter.
    pub fn new(node: CgNode, accessor: ParameterAccessor, hierarchy: &'h dyn ClassHierarchy) -> Result<Self> {
        let values = ValueManager::new(&accessor)?;
        Ok(Self {
            node,
            accessor,
            values,
            factory: TypedInstructionFactory::new(hierarchy),
            instructions: Vec::new(),
            allocations: Vec::new(),
            calls: Vec::new(),
            types_allocated: BTreeSet::new(),
            constants: BTreeMap::new(),
            constant_values: BTreeMap::new(),
        })
    }

    /// Prepends the declared statements of a summary.
    ///
    /// The statements keep their value numbers; fresh numbers start after the highest
    /// number they mention.
    #[must_use]
    pub fn with_summary(mut self, summary: &MethodSummary) -> Self {
        for statement in &summary.statements {
            self.push(statement.clone());
        }
        self.constants
            .extend(summary.constants.iter().map(|(n, c)| (*n, c.clone())));
        if let Some(highest) = summary.max_value_number() {
            self.values.reserve(highest);
        }
        self
    }

    /// The node being built.
    #[must_use]
    pub fn node(&self) -> &CgNode {
        &self.node
    }

    /// The method being modelled.
    #[must_use]
    pub fn method(&self) -> &MethodRef {
        &self.node.method
    }

    /// Parameter numbering of the modelled method.
    #[must_use]
    pub fn accessor(&self) -> &ParameterAccessor {
        &self.accessor
    }

    /// The value manager, for callers that need scopes or named variables.
    pub fn values(&mut self) -> &mut ValueManager {
        &mut self.values
    }

    /// The instruction factory.
    #[must_use]
    pub fn factory(&self) -> TypedInstructionFactory<'h> {
        self.factory
    }

    /// The hierarchy instructions are checked against.
    #[must_use]
    pub fn hierarchy(&self) -> &'h dyn ClassHierarchy {
        self.factory.hierarchy()
    }

    /// Index the next instruction will get.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.instructions.len()
    }

    /// Appends an instruction and returns its index.
    pub fn push(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        match &instruction {
            Instruction::New { .. } => self.allocations.push(index),
            Instruction::Invoke { .. } => self.calls.push(index),
            _ => {}
        }
        self.instructions.push(instruction);
        index
    }

    /// Defines a new value of `ty` for `key` with the instruction `build` returns.
    ///
    /// # Errors
    ///
    /// Propagates value manager and factory errors.
    pub fn define(
        &mut self,
        ty: &TypeRef,
        key: VariableKey,
        build: impl FnOnce(TypedInstructionFactory<'h>, &SsaValue, usize) -> Result<Instruction>,
    ) -> Result<SsaValue> {
        let value = self.values.request_unallocated(ty, key)?;
        let instruction = build(self.factory, &value, self.pc())?;
        let index = self.push(instruction);
        self.values.confirm_allocation(&value, index)?;
        Ok(value)
    }

    /// [`SpecializedMethod::define`] for a temporary nobody refers to by name.
    ///
    /// # Errors
    ///
    /// Propagates value manager and factory errors.
    pub fn temp(
        &mut self,
        ty: &TypeRef,
        build: impl FnOnce(TypedInstructionFactory<'h>, &SsaValue, usize) -> Result<Instruction>,
    ) -> Result<SsaValue> {
        self.define(ty, VariableKey::unique(), build)
    }

    /// A value bound to a literal in the constant table; equal literals of equal type
    /// share one value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoidValue`](crate::Error::VoidValue) for `void`.
    pub fn constant(&mut self, ty: &TypeRef, constant: Constant) -> Result<SsaValue> {
        let key = (ty.clone(), constant);
        if let Some(existing) = self.constant_values.get(&key) {
            return Ok(existing.clone());
        }
        let value = self.values.unmanaged(ty, VariableKey::unique())?;
        value.mark_assigned()?;
        self.constants.insert(value.number(), key.1.clone());
        self.constant_values.insert(key, value.clone());
        Ok(value)
    }

    /// The zero literal of a primitive type: `false`, `0L` or `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) for reference
    /// types and [`Error::VoidValue`](crate::Error::VoidValue) for `void`.
    pub fn zero(&mut self, ty: &TypeRef) -> Result<SsaValue> {
        let literal = match ty.primitive() {
            Some(PrimitiveType::Boolean) => Constant::Bool(false),
            Some(PrimitiveType::Long) => Constant::Long(0),
            Some(_) => Constant::Int(0),
            None => {
                return Err(crate::Error::InvalidArgument(format!(
                    "{ty} has no zero literal"
                )))
            }
        };
        self.constant(ty, literal)
    }

    /// An `int` literal.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`SpecializedMethod::constant`].
    pub fn int_constant(&mut self, value: i32) -> Result<SsaValue> {
        self.constant(&well_known::INT, Constant::Int(value))
    }

    /// A method object literal, typed `Method` or `Constructor`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; see [`SpecializedMethod::constant`].
    pub fn method_constant(&mut self, method: &MethodRef) -> Result<SsaValue> {
        let ty = if method.is_init() {
            well_known::CONSTRUCTOR
        } else {
            well_known::METHOD
        };
        self.constant(&ty, Constant::Method(method.clone()))
    }

    /// Loads the class literal of `ty` and binds it as a `Type` constant.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn load_type(&mut self, ty: &TypeRef) -> Result<SsaValue> {
        let value = self.temp(&well_known::CLASS, |f, result, _| f.load_metadata(result, ty))?;
        self.constants
            .insert(value.number(), Constant::Type(ty.clone()));
        Ok(value)
    }

    /// A fresh exception temporary for a call.
    ///
    /// # Errors
    ///
    /// Never fails in practice.
    pub fn exception(&mut self) -> Result<SsaValue> {
        self.values.exception()
    }

    /// Allocates `ty` unless this body already allocated it.
    ///
    /// Arrays get a constant length of 1 in every dimension.
    ///
    /// # Errors
    ///
    /// Propagates factory errors, for example for primitive types.
    pub fn allocate(&mut self, ty: &TypeRef) -> Result<Option<SsaValue>> {
        if !self.types_allocated.insert(ty.clone()) {
            return Ok(None);
        }
        let key = VariableKey::by_type(ty);
        let value = if ty.is_array() {
            let one = self.int_constant(1)?;
            let sizes = vec![one; ty.name.dimensions()];
            self.define(ty, key, |f, result, pc| f.new_array(pc, result, ty, &sizes))?
        } else {
            self.define(ty, key, |f, result, pc| f.new_object(pc, result, ty))?
        };
        Ok(Some(value))
    }

    /// Calls `target`; returns the result value of non-void targets.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn call(
        &mut self,
        target: &MethodRef,
        dispatch: Dispatch,
        params: &[SsaValue],
    ) -> Result<Option<SsaValue>> {
        let exception = self.exception()?;
        if target.returns_value() {
            let result = self.temp(&target.return_type(), |f, result, pc| {
                f.invoke(pc, result, target, dispatch, params, &exception)
            })?;
            Ok(Some(result))
        } else {
            let instruction = self
                .factory
                .invoke_void(self.pc(), target, dispatch, params, &exception)?;
            self.push(instruction);
            Ok(None)
        }
    }

    /// Calls the no-argument constructor of `ty` on `object`.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn call_default_init(&mut self, ty: &TypeRef, object: &SsaValue) -> Result<()> {
        self.call(&well_known::default_init(ty), Dispatch::Special, std::slice::from_ref(object))?;
        Ok(())
    }

    /// Returns `value`.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn return_value(&mut self, value: &SsaValue) -> Result<()> {
        let instruction = self.factory.return_value(value)?;
        self.push(instruction);
        Ok(())
    }

    /// Returns without a value.
    pub fn return_void(&mut self) {
        let instruction = self.factory.return_void();
        self.push(instruction);
    }

    /// Allocates an exception of type `ty` and throws it.
    ///
    /// # Errors
    ///
    /// Propagates factory errors, for example when `ty` is not a `Throwable`.
    pub fn throw_new(&mut self, ty: &TypeRef) -> Result<()> {
        let exception = self.temp(ty, |f, result, pc| f.new_object(pc, result, ty))?;
        let instruction = self.factory.throw(&exception)?;
        self.push(instruction);
        Ok(())
    }

    /// Indices of allocation instructions.
    #[must_use]
    pub fn allocations(&self) -> &[usize] {
        &self.allocations
    }

    /// Indices of call instructions.
    #[must_use]
    pub fn calls(&self) -> &[usize] {
        &self.calls
    }

    /// Types allocated so far.
    #[must_use]
    pub fn types_allocated(&self) -> &BTreeSet<TypeRef> {
        &self.types_allocated
    }

    /// Seals the body.
    #[must_use]
    pub fn finish(self) -> SyntheticIr {
        let names = self.values.local_names();
        SyntheticIr::new(&self.node, self.instructions, self.constants, names)
    }
}
