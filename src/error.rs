use thiserror::Error;

use crate::types::{MethodRef, TypeRef};

/// Builds an [`Error::Internal`] carrying the source location of the failed check.
macro_rules! internal_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Internal {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Internal {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes a violated contract inside the synthetic-body construction logic
/// or a misuse of the public API. Input that merely cannot be resolved (an unknown class
/// name, a factory without recorded types) never produces an error; it degrades to an
/// empty or throwing body instead, and precision problems end up in the
/// [`EventLog`](crate::events::EventLog).
///
/// # Error Categories
///
/// ## Value Errors
/// - [`Error::AlreadyAssigned`] - An SSA value was defined twice
/// - [`Error::VoidValue`] - An SSA value of type `void` was requested
///
/// ## Instruction Errors
/// - [`Error::TypeMismatch`] - An operand is not assignable to the expected type
/// - [`Error::ScopeMismatch`] - Operands belong to different methods
/// - [`Error::InvalidArgument`] - Malformed instruction request (arity, empty phi, ...)
///
/// ## Parameter Errors
/// - [`Error::ParameterOutOfRange`] - Parameter index outside `1..=n`
/// - [`Error::NoReceiver`] - Receiver requested on a static method
/// - [`Error::NoReturn`] - Return value requested on a void method
/// - [`Error::MethodNotFound`] - Hierarchy knows no target for a method reference
/// - [`Error::ConflictingStaticness`] - Hierarchy targets disagree on staticness
///
/// ## Value Manager Errors
/// - [`Error::PendingAllocation`] - Second unallocated slot for one key
/// - [`Error::AlreadyAllocated`] - Allocation confirmed without a pending slot
/// - [`Error::UnknownVariable`] - Key was never seen
/// - [`Error::NoCurrentValue`] - Key has no live value in scope
/// - [`Error::NoPendingPhi`] - Phi confirmed without a matching free slot
/// - [`Error::ScopeOrder`] - Scopes were exited out of order
/// - [`Error::ScopeUnderflow`] - Exit requested at the outermost scope
///
/// ## Dispatch Errors
/// - [`Error::NotUnderstood`] - No interpreter handles a call-graph node
/// - [`Error::Internal`] - Internal consistency check failed
///
/// # Examples
///
/// ```rust,ignore
/// use reflectir::{Error, ssa::ParameterAccessor};
///
/// match accessor.parameter(0) {
///     Err(Error::ParameterOutOfRange { index, count, .. }) => {
///         eprintln!("parameter {index} outside 1..={count}");
///     }
///     Err(e) => eprintln!("other error: {e}"),
///     Ok(param) => println!("{param}"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Value errors
    /// An SSA value was marked as assigned a second time.
    ///
    /// Every value has exactly one definition. Seeing this means two instructions were
    /// built that both define the same slot.
    #[error("SSA value {0} was assigned to twice")]
    AlreadyAssigned(String),

    /// An SSA value of type `void` was requested.
    #[error("Can not create an SSA value of type void (number {0})")]
    VoidValue(u32),

    // Instruction errors
    /// An operand's type is not assignable to the type the instruction expects.
    ///
    /// # Fields
    ///
    /// * `expected` - The type required by the signature, field or array element
    /// * `found` - The type of the offending operand
    /// * `what` - Which operand of which instruction failed the check
    #[error("Type mismatch in {what}: {found} is not assignable to {expected}")]
    TypeMismatch {
        /// Type the instruction expects
        expected: TypeRef,
        /// Type of the offending operand
        found: TypeRef,
        /// Description of the operand
        what: String,
    },

    /// Operands of one instruction are valid in different methods.
    #[error("Values are valid in different methods: {0}")]
    ScopeMismatch(String),

    /// An instruction request is malformed.
    ///
    /// Covers wrong argument counts, empty phi operand lists, phi-to-self,
    /// a result that is also used as a parameter, and dispatch kinds that do not
    /// fit the callee.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Parameter errors
    /// A parameter index outside `1..=count` was requested.
    #[error("Parameter {index} of {method} is out of range 1..={count}")]
    ParameterOutOfRange {
        /// The requested 1-based index
        index: usize,
        /// Number of declared parameters
        count: usize,
        /// The method that was queried
        method: MethodRef,
    },

    /// The implicit receiver of a static method was requested.
    #[error("{0} is static and has no implicit receiver")]
    NoReceiver(MethodRef),

    /// A return value was requested for a void method.
    #[error("{0} returns void")]
    NoReturn(MethodRef),

    /// The hierarchy knows no target for the method reference.
    #[error("Unable to look up the method {0}")]
    MethodNotFound(MethodRef),

    /// The hierarchy knows several targets that disagree about having a receiver.
    #[error("The targets of {0} contradict each other on staticness")]
    ConflictingStaticness(MethodRef),

    // Value manager errors
    /// A second unallocated slot was requested for a key.
    #[error("There may be only one unallocated value for key {0} at a time")]
    PendingAllocation(String),

    /// An allocation was confirmed for a key that has no pending slot.
    #[error("Value {value} using key {key} has already been allocated")]
    AlreadyAllocated {
        /// The value being confirmed
        value: String,
        /// Its variable key
        key: String,
    },

    /// The key was never handed to the value manager.
    #[error("Key {0} has never been seen before")]
    UnknownVariable(String),

    /// The key has no allocated or free value visible from the current scope.
    #[error("No suitable value has been found for key {0}")]
    NoCurrentValue(String),

    /// A phi was confirmed for a value that has no matching free slot.
    #[error("No free slot awaits a phi for value {0}")]
    NoPendingPhi(String),

    /// A scope was exited while a slot of a deeper scope was still live.
    #[error("Scope exited out of order: {0}")]
    ScopeOrder(String),

    /// `exit_scope` was called on the outermost scope.
    #[error("Can not exit the outermost scope")]
    ScopeUnderflow,

    // Dispatch errors
    /// No interpreter understands the requested call-graph node.
    #[error("No interpreter understands {0}")]
    NotUnderstood(String),

    /// An internal consistency check failed.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Internal - {file}:{line}: {message}")]
    Internal {
        /// The message to be printed for the Internal error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
