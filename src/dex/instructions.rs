//! Operands and logical instructions accepted by a method builder

use crate::dex::error::DexError;
use crate::dex::ir::{FieldId, MethodId, StringId, TypeId};
use crate::dex::registers::LiveRegister;
use std::fmt;

/// An instruction operand.
///
/// Parameters are numbered in their own space (slot 0 is `this` for instance methods) and only
/// resolve to physical registers once the frame size is known at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Local(usize),
    Parameter(usize),
    Immediate(i64),
    Label(usize),
    String(StringId),
    Type(TypeId),
}

impl Value {
    pub fn is_register(&self) -> bool {
        matches!(self, Value::Local(_))
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Value::Parameter(_))
    }

    pub fn is_variable(&self) -> bool {
        self.is_register() || self.is_parameter()
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, Value::Immediate(_))
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Value::Label(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Value::Type(_))
    }

    /// The second register of a wide (long or double) value.
    pub fn wide_pair(&self) -> Result<Value, DexError> {
        match self {
            Value::Local(r) => Ok(Value::Local(r + 1)),
            Value::Parameter(p) => Ok(Value::Parameter(p + 1)),
            other => Err(err!(InvariantViolation, "{} has no wide pair", other)),
        }
    }
}

impl From<&LiveRegister> for Value {
    fn from(register: &LiveRegister) -> Value {
        Value::Local(register.index())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Local(r) => write!(f, "v{}", r),
            Value::Parameter(p) => write!(f, "p{}", p),
            Value::Immediate(i) => write!(f, "#{}", i),
            Value::Label(l) => write!(f, ":L{}", l),
            Value::String(s) => write!(f, "{}", s),
            Value::Type(t) => write!(f, "{}", t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Return,
    ReturnObject,
    ReturnWide,
    Move,
    MoveObject,
    MoveWide,
    InvokeVirtual,
    InvokeDirect,
    InvokeStatic,
    InvokeInterface,
    InvokeVirtualRange,
    InvokeDirectRange,
    InvokeStaticRange,
    InvokeInterfaceRange,
    BindLabel,
    BranchEqz,
    BranchNEqz,
    New,
    NewArray,
    CheckCast,
    GetStaticField,
    GetStaticObjectField,
    SetStaticField,
    SetStaticObjectField,
    GetInstanceField,
    GetInstanceObjectField,
    SetInstanceField,
    SetInstanceObjectField,
    AputObject,
}


/// One logical instruction; it may encode to several physical ones (invoke plus move-result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    op: Op,
    index_argument: u32,
    result_is_object: bool,
    result_is_wide: bool,
    dest: Option<Value>,
    args: Vec<Value>,
}

impl Instruction {
    fn new(op: Op, index_argument: u32, dest: Option<Value>, args: Vec<Value>) -> Instruction {
        Instruction {
            op,
            index_argument,
            result_is_object: false,
            result_is_wide: false,
            dest,
            args,
        }
    }

    /// An instruction with no destination and no arguments, e.g. `Op::Return` for `return-void`.
    pub fn op_no_args(op: Op) -> Instruction {
        Instruction::new(op, 0, None, Vec::new())
    }

    pub fn op_with_args(op: Op, dest: Option<Value>, args: &[Value]) -> Instruction {
        Instruction::new(op, 0, dest, args.to_vec())
    }

    /// Marks the result of an invoke as an object reference (`move-result-object`).
    pub fn returning_object(mut self) -> Instruction {
        self.result_is_object = true;
        self
    }

    /// Marks the result of an invoke as a register pair (`move-result-wide`).
    pub fn returning_wide(mut self) -> Instruction {
        self.result_is_wide = true;
        self
    }

    fn invoke(op: Op, method: MethodId, dest: Option<Value>, this: Option<Value>, args: &[Value]) -> Instruction {
        let args = this.into_iter().chain(args.iter().copied()).collect();
        Instruction::new(op, method.index(), dest, args)
    }

    pub fn invoke_virtual(method: MethodId, dest: Option<Value>, this: Value, args: &[Value]) -> Instruction {
        Instruction::invoke(Op::InvokeVirtual, method, dest, Some(this), args)
    }

    pub fn invoke_virtual_object(method: MethodId, dest: Option<Value>, this: Value, args: &[Value]) -> Instruction {
        Instruction::invoke_virtual(method, dest, this, args).returning_object()
    }

    pub fn invoke_virtual_wide(method: MethodId, dest: Option<Value>, this: Value, args: &[Value]) -> Instruction {
        Instruction::invoke_virtual(method, dest, this, args).returning_wide()
    }

    pub fn invoke_direct(method: MethodId, dest: Option<Value>, this: Value, args: &[Value]) -> Instruction {
        Instruction::invoke(Op::InvokeDirect, method, dest, Some(this), args)
    }

    pub fn invoke_static(method: MethodId, dest: Option<Value>, args: &[Value]) -> Instruction {
        Instruction::invoke(Op::InvokeStatic, method, dest, None, args)
    }

    pub fn invoke_static_object(method: MethodId, dest: Option<Value>, args: &[Value]) -> Instruction {
        Instruction::invoke_static(method, dest, args).returning_object()
    }

    pub fn invoke_static_wide(method: MethodId, dest: Option<Value>, args: &[Value]) -> Instruction {
        Instruction::invoke_static(method, dest, args).returning_wide()
    }

    pub fn invoke_interface(method: MethodId, dest: Option<Value>, this: Value, args: &[Value]) -> Instruction {
        Instruction::invoke(Op::InvokeInterface, method, dest, Some(this), args)
    }

    fn invoke_range(op: Op, method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::new(op, method.index(), dest, vec![first, Value::Immediate(count as i64)])
    }

    /// Passes `count` consecutive registers starting at `first`.
    pub fn invoke_virtual_range(method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::invoke_range(Op::InvokeVirtualRange, method, dest, first, count)
    }

    pub fn invoke_direct_range(method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::invoke_range(Op::InvokeDirectRange, method, dest, first, count)
    }

    pub fn invoke_static_range(method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::invoke_range(Op::InvokeStaticRange, method, dest, first, count)
    }

    pub fn invoke_static_object_range(method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::invoke_static_range(method, dest, first, count).returning_object()
    }

    pub fn invoke_interface_range(method: MethodId, dest: Option<Value>, first: Value, count: usize) -> Instruction {
        Instruction::invoke_range(Op::InvokeInterfaceRange, method, dest, first, count)
    }

    pub fn get_static_field(field: FieldId, dest: Value) -> Instruction {
        Instruction::new(Op::GetStaticField, field.index(), Some(dest), Vec::new())
    }

    pub fn get_static_object_field(field: FieldId, dest: Value) -> Instruction {
        Instruction::new(Op::GetStaticObjectField, field.index(), Some(dest), Vec::new())
    }

    pub fn set_static_field(field: FieldId, value: Value) -> Instruction {
        Instruction::new(Op::SetStaticField, field.index(), None, vec![value])
    }

    pub fn set_static_object_field(field: FieldId, value: Value) -> Instruction {
        Instruction::new(Op::SetStaticObjectField, field.index(), None, vec![value])
    }

    pub fn get_field(field: FieldId, dest: Value, object: Value) -> Instruction {
        Instruction::new(Op::GetInstanceField, field.index(), Some(dest), vec![object])
    }

    pub fn get_object_field(field: FieldId, dest: Value, object: Value) -> Instruction {
        Instruction::new(Op::GetInstanceObjectField, field.index(), Some(dest), vec![object])
    }

    pub fn set_field(field: FieldId, object: Value, value: Value) -> Instruction {
        Instruction::new(Op::SetInstanceField, field.index(), None, vec![object, value])
    }

    pub fn set_object_field(field: FieldId, object: Value, value: Value) -> Instruction {
        Instruction::new(Op::SetInstanceObjectField, field.index(), None, vec![object, value])
    }

    /// `check-cast` of `value` in place.
    pub fn cast(value: Value, ty: Value) -> Instruction {
        Instruction::new(Op::CheckCast, 0, Some(value), vec![ty])
    }

    pub fn new_instance(dest: Value, ty: Value) -> Instruction {
        Instruction::new(Op::New, 0, Some(dest), vec![ty])
    }

    pub fn new_array(dest: Value, length: Value, ty: Value) -> Instruction {
        Instruction::new(Op::NewArray, 0, Some(dest), vec![length, ty])
    }

    /// `value` is stored into `array[index]`.
    pub fn aput_object(value: Value, array: Value, index: Value) -> Instruction {
        Instruction::new(Op::AputObject, 0, Some(value), vec![array, index])
    }

    pub fn bind_label(label: Value) -> Instruction {
        Instruction::new(Op::BindLabel, 0, None, vec![label])
    }

    pub fn branch_eqz(value: Value, label: Value) -> Instruction {
        Instruction::new(Op::BranchEqz, 0, None, vec![value, label])
    }

    pub fn branch_nez(value: Value, label: Value) -> Instruction {
        Instruction::new(Op::BranchNEqz, 0, None, vec![value, label])
    }

    pub fn return_void() -> Instruction {
        Instruction::op_no_args(Op::Return)
    }

    pub fn return_value(op: Op, value: Value) -> Instruction {
        Instruction::new(op, 0, None, vec![value])
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn index_argument(&self) -> u32 {
        self.index_argument
    }

    pub fn result_is_object(&self) -> bool {
        self.result_is_object
    }

    pub fn result_is_wide(&self) -> bool {
        self.result_is_wide
    }

    pub fn dest(&self) -> Option<Value> {
        self.dest
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.op)?;
        if let Some(dest) = self.dest {
            write!(f, " {} <-", dest)?;
        }
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
