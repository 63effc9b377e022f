//! Instructions of synthetic method bodies.
//!
//! Instructions refer to operands by [`ValueNumber`]. Types, fields and call targets are
//! carried as unresolved references so a finished body is a plain value that can be
//! compared, hashed and cached.

use std::fmt;

use crate::{
    ssa::ValueNumber,
    types::{Descriptor, FieldRef, MethodRef, TypeRef},
};

/// How a call selects its target at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dispatch {
    /// Dispatch on the receiver's runtime class
    Virtual,
    /// Exact target; constructors, private and super calls
    Special,
    /// No receiver
    Static,
    /// Dispatch through an interface
    Interface,
}

impl Dispatch {
    /// Returns `true` when the call passes a receiver.
    #[must_use]
    pub const fn has_receiver(self) -> bool {
        !matches!(self, Self::Static)
    }

    /// The bytecode mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Virtual => "invokevirtual",
            Self::Special => "invokespecial",
            Self::Static => "invokestatic",
            Self::Interface => "invokeinterface",
        }
    }
}

/// Literal values a symbol table or a context can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    /// The null reference
    Null,
    /// A boolean literal
    Bool(bool),
    /// An `int` literal
    Int(i32),
    /// A `long` literal
    Long(i64),
    /// A string literal
    String(String),
    /// A class literal (`Foo.class`)
    Type(TypeRef),
    /// A method or constructor object
    Method(MethodRef),
    /// A direct method handle to the method
    MethodHandle(MethodRef),
    /// A method type object
    MethodType(Descriptor),
}

impl Constant {
    /// The string value of string literals.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The type of class literals.
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// The method of method objects.
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodRef> {
        match self {
            Self::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The target of method handles.
    #[must_use]
    pub fn as_method_handle(&self) -> Option<&MethodRef> {
        match self {
            Self::MethodHandle(method) => Some(method),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}L"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Type(ty) => write!(f, "{ty}.class"),
            Self::Method(m) => write!(f, "{m}"),
            Self::MethodHandle(m) => write!(f, "MethodHandle({m})"),
            Self::MethodType(d) => write!(f, "MethodType{d}"),
        }
    }
}

/// An allocation site: position in the body plus allocated type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewSite {
    /// Index of the allocating instruction
    pub pc: usize,
    /// Allocated type
    pub ty: TypeRef,
}

impl fmt::Display for NewSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ty, self.pc)
    }
}

/// A call site: position, declared target, dispatch kind and argument values.
///
/// Arguments include the receiver in position 0 for calls that have one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteRef {
    /// Index of the calling instruction
    pub pc: usize,
    /// The method named at the call site
    pub target: MethodRef,
    /// How the target is selected
    pub dispatch: Dispatch,
    /// Argument value numbers in the caller, receiver first
    pub args: Vec<ValueNumber>,
}

impl CallSiteRef {
    /// Creates a call site.
    #[must_use]
    pub fn new(pc: usize, target: MethodRef, dispatch: Dispatch, args: Vec<ValueNumber>) -> Self {
        Self {
            pc,
            target,
            dispatch,
            args,
        }
    }

    /// The receiver value of calls that have one.
    #[must_use]
    pub fn receiver(&self) -> Option<ValueNumber> {
        if self.dispatch.has_receiver() {
            self.args.first().copied()
        } else {
            None
        }
    }
}

impl fmt::Display for CallSiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.dispatch.mnemonic(), self.target, self.pc)
    }
}

/// Comparison of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl fmt::Display for BranchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Gt => "gt",
            Self::Le => "le",
        })
    }
}

/// One instruction of a synthetic body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Allocates an object, or an array when `sizes` is non-empty.
    New {
        /// The allocated reference
        result: ValueNumber,
        /// Where and what is allocated
        site: NewSite,
        /// One length per allocated array dimension
        sizes: Vec<ValueNumber>,
    },
    /// Calls a method.
    Invoke {
        /// The return value, `None` for void calls
        result: Option<ValueNumber>,
        /// Value holding the exception the call may throw
        exception: ValueNumber,
        /// Target and arguments
        site: CallSiteRef,
    },
    /// Reads an instance field, or a static field when `object` is `None`.
    GetField {
        /// The read value
        result: ValueNumber,
        /// The object read from
        object: Option<ValueNumber>,
        /// The field
        field: FieldRef,
    },
    /// Writes an instance field, or a static field when `object` is `None`.
    PutField {
        /// The object written to
        object: Option<ValueNumber>,
        /// The stored value
        value: ValueNumber,
        /// The field
        field: FieldRef,
    },
    /// Reads an array element.
    ArrayLoad {
        /// The read element
        result: ValueNumber,
        /// The array
        array: ValueNumber,
        /// The index
        index: ValueNumber,
        /// Declared element type
        element: TypeRef,
    },
    /// Writes an array element.
    ArrayStore {
        /// The array
        array: ValueNumber,
        /// The index
        index: ValueNumber,
        /// The stored value
        value: ValueNumber,
        /// Declared element type
        element: TypeRef,
    },
    /// Reads the length of an array.
    ArrayLength {
        /// The length
        result: ValueNumber,
        /// The array
        array: ValueNumber,
    },
    /// Narrows a reference to a type.
    CheckCast {
        /// The cast reference
        result: ValueNumber,
        /// The original reference
        value: ValueNumber,
        /// Target type
        ty: TypeRef,
    },
    /// Loads a class literal.
    LoadMetadata {
        /// The `java.lang.Class` object
        result: ValueNumber,
        /// The type it denotes
        token: TypeRef,
    },
    /// Returns from the method.
    Return {
        /// The returned value, `None` for void returns
        value: Option<ValueNumber>,
    },
    /// Throws an exception.
    Throw {
        /// The thrown value
        exception: ValueNumber,
    },
    /// Merges values flowing in from different paths.
    Phi {
        /// The merged value
        result: ValueNumber,
        /// The merged operands
        operands: Vec<ValueNumber>,
    },
    /// Jumps unconditionally.
    Goto {
        /// Index of the target instruction
        target: usize,
    },
    /// Jumps when the comparison holds.
    Branch {
        /// The comparison
        op: BranchOp,
        /// Left operand
        lhs: ValueNumber,
        /// Right operand
        rhs: ValueNumber,
        /// Index of the target instruction
        target: usize,
    },
}

impl Instruction {
    /// Values defined by this instruction.
    #[must_use]
    pub fn defs(&self) -> Vec<ValueNumber> {
        match self {
            Self::New { result, .. }
            | Self::GetField { result, .. }
            | Self::ArrayLoad { result, .. }
            | Self::ArrayLength { result, .. }
            | Self::CheckCast { result, .. }
            | Self::LoadMetadata { result, .. }
            | Self::Phi { result, .. } => vec![*result],
            Self::Invoke {
                result, exception, ..
            } => result.iter().copied().chain([*exception]).collect(),
            Self::PutField { .. }
            | Self::ArrayStore { .. }
            | Self::Return { .. }
            | Self::Throw { .. }
            | Self::Goto { .. }
            | Self::Branch { .. } => Vec::new(),
        }
    }

    /// Values read by this instruction, in operand order.
    #[must_use]
    pub fn uses(&self) -> Vec<ValueNumber> {
        match self {
            Self::New { sizes, .. } => sizes.clone(),
            Self::Invoke { site, .. } => site.args.clone(),
            Self::GetField { object, .. } => object.iter().copied().collect(),
            Self::PutField { object, value, .. } => {
                object.iter().copied().chain([*value]).collect()
            }
            Self::ArrayLoad { array, index, .. } => vec![*array, *index],
            Self::ArrayStore {
                array,
                index,
                value,
                ..
            } => vec![*array, *index, *value],
            Self::ArrayLength { array, .. } => vec![*array],
            Self::CheckCast { value, .. } => vec![*value],
            Self::Return { value } => value.iter().copied().collect(),
            Self::Throw { exception } => vec![*exception],
            Self::Phi { operands, .. } => operands.clone(),
            Self::Branch { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::LoadMetadata { .. } | Self::Goto { .. } => Vec::new(),
        }
    }

    /// Returns `true` for instructions that end a basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Return { .. } | Self::Throw { .. } | Self::Goto { .. } | Self::Branch { .. }
        )
    }

    /// Jump target of `Goto` and `Branch`.
    #[must_use]
    pub fn branch_target(&self) -> Option<usize> {
        match self {
            Self::Goto { target } | Self::Branch { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Returns `true` for instructions that leave the method.
    #[must_use]
    pub fn exits_method(&self) -> bool {
        matches!(self, Self::Return { .. } | Self::Throw { .. })
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[ValueNumber]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New {
                result,
                site,
                sizes,
            } => {
                write!(f, "{result} = new {site}")?;
                if !sizes.is_empty() {
                    f.write_str(" [")?;
                    write_list(f, sizes)?;
                    f.write_str("]")?;
                }
                Ok(())
            }
            Self::Invoke {
                result,
                exception,
                site,
            } => {
                if let Some(result) = result {
                    write!(f, "{result} = ")?;
                }
                write!(f, "{} {} ", site.dispatch.mnemonic(), site.target)?;
                write_list(f, &site.args)?;
                write!(f, " @{} exception:{exception}", site.pc)
            }
            Self::GetField {
                result,
                object: Some(object),
                field,
            } => write!(f, "{result} = getfield {field} {object}"),
            Self::GetField {
                result,
                object: None,
                field,
            } => write!(f, "{result} = getstatic {field}"),
            Self::PutField {
                object: Some(object),
                value,
                field,
            } => write!(f, "putfield {object}.{field} = {value}"),
            Self::PutField {
                object: None,
                value,
                field,
            } => write!(f, "putstatic {field} = {value}"),
            Self::ArrayLoad {
                result,
                array,
                index,
                ..
            } => write!(f, "{result} = arrayload {array}[{index}]"),
            Self::ArrayStore {
                array,
                index,
                value,
                ..
            } => write!(f, "arraystore {array}[{index}] = {value}"),
            Self::ArrayLength { result, array } => write!(f, "{result} = arraylength {array}"),
            Self::CheckCast { result, value, ty } => {
                write!(f, "{result} = checkcast {ty} {value}")
            }
            Self::LoadMetadata { result, token } => {
                write!(f, "{result} = load_metadata {token}")
            }
            Self::Return { value: Some(value) } => write!(f, "return {value}"),
            Self::Return { value: None } => f.write_str("return"),
            Self::Throw { exception } => write!(f, "throw {exception}"),
            Self::Phi { result, operands } => {
                write!(f, "{result} = phi ")?;
                write_list(f, operands)
            }
            Self::Goto { target } => write!(f, "goto {target}"),
            Self::Branch {
                op,
                lhs,
                rhs,
                target,
            } => write!(f, "if {lhs} {op} {rhs} goto {target}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::well_known;

    #[test]
    fn test_invoke_defs_and_uses() {
        let invoke = Instruction::Invoke {
            result: Some(ValueNumber(5)),
            exception: ValueNumber(6),
            site: CallSiteRef::new(
                1,
                well_known::object_get_class(),
                Dispatch::Virtual,
                vec![ValueNumber(1)],
            ),
        };
        assert_eq!(invoke.defs(), vec![ValueNumber(5), ValueNumber(6)]);
        assert_eq!(invoke.uses(), vec![ValueNumber(1)]);
        assert!(!invoke.is_terminator());
        assert_eq!(
            invoke.to_string(),
            "v5 = invokevirtual Ljava/lang/Object.getClass()Ljava/lang/Class; v1 @1 exception:v6"
        );
    }

    #[test]
    fn test_terminators() {
        let ret = Instruction::Return {
            value: Some(ValueNumber(3)),
        };
        assert!(ret.is_terminator());
        assert!(ret.exits_method());
        assert_eq!(ret.uses(), vec![ValueNumber(3)]);
        assert_eq!(ret.to_string(), "return v3");

        let branch = Instruction::Branch {
            op: BranchOp::Eq,
            lhs: ValueNumber(1),
            rhs: ValueNumber(2),
            target: 7,
        };
        assert_eq!(branch.branch_target(), Some(7));
        assert!(!branch.exits_method());
    }

    #[test]
    fn test_constant_accessors() {
        let ty = Constant::Type(well_known::STRING);
        assert_eq!(ty.as_type(), Some(&well_known::STRING));
        assert!(ty.as_str().is_none());
        assert_eq!(ty.to_string(), "Ljava/lang/String.class");
        assert_eq!(Constant::String("a.B".into()).as_str(), Some("a.B"));
    }
}
