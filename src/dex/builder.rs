use crate::dex::dex_file::{AccessFlags, CodeItem};
use crate::dex::encoder::{
    encode_10x, encode_11n, encode_11x, encode_21c, encode_21s, encode_21t, encode_22c,
    encode_23x, encode_31i, encode_32x, encode_35c, encode_3rc,
};
use crate::dex::error::DexError;
use crate::dex::instructions::{Instruction, Op, Value};
use crate::dex::ir::{ClassDef, ClassId, EncodedField, EncodedMethod, FieldId, MethodId, ProtoId, StringId, TypeId};
use crate::dex::labels::LabelTable;
use crate::dex::opcodes::*;
use crate::dex::pool::DexPools;
use crate::dex::registers::{LiveRegister, RegisterFile};
use crate::dex::writer::{write_image, ImageOptions};
use crate::types::{Prototype, TypeDescriptor};
use log::{debug, trace};
use std::borrow::Cow;

/// Registers reserved between the locals and the incoming arguments of every method.
pub const MAX_SCRATCH_REGISTERS: usize = 5;
/// Argument limit of the short invoke form as used by the builder; larger calls need a range.
pub const MAX_SHORT_INVOKE_ARGS: usize = 4;

fn is_short_register(value: Value) -> bool {
    matches!(value, Value::Local(r) if r < 16)
}

/// Root of a module under construction
///
/// Owns every pool and every class node. Classes, fields and methods are added through the
/// builders handed out by [`DexBuilder::make_class`].
///
/// # Examples
///
/// ```
///  use dexbuilder::dex::builder::DexBuilder;
///  use dexbuilder::dex::instructions::{Instruction, Op, Value};
///  use dexbuilder::types::{Prototype, TypeDescriptor};
///
///  let mut dex = DexBuilder::new();
///  let mut class = dex.make_class("pkg.Foo");
///  let mut method = class.create_method(
///      "bar",
///      Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]),
///  );
///  let length = method.dex().get_or_declare_method(
///      &TypeDescriptor::STRING,
///      "length",
///      &Prototype::returning(TypeDescriptor::INT),
///  );
///  let result = method.alloc_register();
///  method
///      .add_instruction(Instruction::invoke_virtual(length, Some((&result).into()), Value::Parameter(0), &[]))
///      .add_instruction(Instruction::return_value(Op::Return, (&result).into()));
///  method.encode().unwrap();
///
///  let image = dex.create_image(true).unwrap();
///  assert!(image.starts_with(b"dex\n035\0"));
/// ```
#[derive(Debug, Default)]
pub struct DexBuilder {
    pools: DexPools,
    classes: Vec<ClassDef>,
}

impl DexBuilder {
    pub fn new() -> DexBuilder {
        DexBuilder::default()
    }

    /// Starts (or resumes) the definition of the class with the given dotted name.
    ///
    /// A new class is public and extends `java.lang.Object`.
    pub fn make_class(&mut self, name: &str) -> ClassBuilder<'_> {
        let descriptor = TypeDescriptor::from_classname(name);
        let class_type = self.pools.get_or_add_type(&descriptor);
        let existing = self.pools.type_entry(class_type).class_def;
        let class = match existing {
            Some(existing) => existing,
            None => {
                let super_class = self.pools.get_or_add_type(&TypeDescriptor::OBJECT);
                let id = ClassId::from_index(self.classes.len());
                self.classes.push(ClassDef::new(class_type, super_class));
                self.pools.link_class(class_type, id);
                debug!("created class {} as {}", descriptor, id);
                id
            }
        };
        ClassBuilder {
            dex: self,
            class,
            descriptor,
        }
    }

    pub fn get_or_add_string<'a, S: Into<Cow<'a, str>>>(&mut self, value: S) -> StringId {
        self.pools.get_or_add_string(value)
    }

    pub fn get_or_add_type(&mut self, ty: &TypeDescriptor) -> TypeId {
        self.pools.get_or_add_type(ty)
    }

    pub fn get_or_add_field(&mut self, parent: &TypeDescriptor, name: &str, field_type: &TypeDescriptor) -> FieldId {
        self.pools.get_or_add_field(parent, name, field_type)
    }

    /// Declares a method reference, typically one defined outside this module.
    pub fn get_or_declare_method(&mut self, parent: &TypeDescriptor, name: &str, prototype: &Prototype) -> MethodId {
        self.pools.get_or_add_method(parent, name, prototype)
    }

    pub fn get_or_encode_proto(&mut self, prototype: &Prototype) -> ProtoId {
        self.pools.get_or_encode_proto(prototype)
    }

    pub fn get_prototype_by_method_id(&self, id: MethodId) -> Option<Prototype> {
        self.pools.get_prototype_by_method_id(id)
    }

    pub fn pools(&self) -> &DexPools {
        &self.pools
    }

    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    pub fn class_def(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.slot()]
    }

    /// Serializes the module. `checksum` controls the Adler-32 checksum of the header.
    pub fn create_image(&self, checksum: bool) -> Result<Vec<u8>, DexError> {
        self.create_image_with(&ImageOptions {
            checksum,
            ..ImageOptions::default()
        })
    }

    pub fn create_image_with(&self, options: &ImageOptions) -> Result<Vec<u8>, DexError> {
        write_image(&self.pools, &self.classes, options)
    }
}

/// Mutable view of one class of a [`DexBuilder`].
pub struct ClassBuilder<'a> {
    dex: &'a mut DexBuilder,
    class: ClassId,
    descriptor: TypeDescriptor,
}

impl<'a> ClassBuilder<'a> {
    pub fn id(&self) -> ClassId {
        self.class
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The owning module, for references to other classes and members.
    pub fn dex(&mut self) -> &mut DexBuilder {
        self.dex
    }

    fn class_def(&mut self) -> &mut ClassDef {
        &mut self.dex.classes[self.class.slot()]
    }

    /// Declares a method on this class; its body is added through the returned builder.
    pub fn create_method(&mut self, name: &str, prototype: Prototype) -> MethodBuilder<'_> {
        let decl = self.dex.pools.get_or_add_method(&self.descriptor, name, &prototype);
        MethodBuilder {
            dex: &mut *self.dex,
            class: self.class,
            decl,
            prototype,
            access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
            instructions: Vec::new(),
            registers: RegisterFile::default(),
            labels: LabelTable::default(),
            buffer: Vec::new(),
            max_args: 0,
        }
    }

    pub fn create_field(&mut self, name: &str, field_type: TypeDescriptor) -> FieldBuilder<'_> {
        let decl = self.dex.pools.get_or_add_field(&self.descriptor, name, &field_type);
        FieldBuilder {
            dex: &mut *self.dex,
            class: self.class,
            decl,
            access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
        }
    }

    pub fn set_super_class(&mut self, super_class: &TypeDescriptor) -> &mut Self {
        let id = self.dex.pools.get_or_add_type(super_class);
        self.class_def().super_class = id;
        self
    }

    pub fn set_source_file(&mut self, source: &str) -> &mut Self {
        let id = self.dex.pools.get_or_add_string(source);
        self.class_def().source_file = Some(id);
        self
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) -> &mut Self {
        self.class_def().access_flags = access_flags;
        self
    }
}

/// Defines one field of a class; nothing is added to the class until [`FieldBuilder::encode`].
pub struct FieldBuilder<'c> {
    dex: &'c mut DexBuilder,
    class: ClassId,
    decl: FieldId,
    access_flags: AccessFlags,
}

impl<'c> FieldBuilder<'c> {
    pub fn id(&self) -> FieldId {
        self.decl
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) -> &mut Self {
        self.access_flags = access_flags;
        self
    }

    /// Adds the field to its class: static fields (the default) and instance fields are kept in
    /// separate lists.
    pub fn encode(self) -> Result<FieldId, DexError> {
        let class = &mut self.dex.classes[self.class.slot()];
        if class.fields().any(|f| f.decl == self.decl) {
            fail!(InvariantViolation, "{} is already defined on its class", self.decl);
        }
        let field = EncodedField {
            decl: self.decl,
            access_flags: self.access_flags,
        };
        if self.access_flags.contains(AccessFlags::STATIC) {
            class.static_fields.push(field);
        } else {
            class.instance_fields.push(field);
        }
        debug!("encoded {} with flags {:?}", self.decl, self.access_flags);
        Ok(self.decl)
    }
}

/// Assembles the body of one method
///
/// Instructions are collected by [`add_instruction`](MethodBuilder::add_instruction) and only
/// encoded by [`encode`](MethodBuilder::encode), once the number of locals is final. Parameters
/// then map to the last registers of the frame, after the locals and the scratch registers.
pub struct MethodBuilder<'c> {
    dex: &'c mut DexBuilder,
    class: ClassId,
    decl: MethodId,
    prototype: Prototype,
    access_flags: AccessFlags,
    instructions: Vec<Instruction>,
    registers: RegisterFile,
    labels: LabelTable,
    buffer: Vec<u16>,
    max_args: usize,
}

impl<'c> MethodBuilder<'c> {
    pub fn id(&self) -> MethodId {
        self.decl
    }

    pub fn prototype(&self) -> &Prototype {
        &self.prototype
    }

    pub fn dex(&mut self) -> &mut DexBuilder {
        self.dex
    }

    /// Methods are `public static` unless told otherwise. Instance methods receive `this` as
    /// parameter 0.
    pub fn set_access_flags(&mut self, access_flags: AccessFlags) -> &mut Self {
        self.access_flags = access_flags;
        self
    }

    pub fn alloc_register(&self) -> LiveRegister {
        self.registers.alloc()
    }

    pub fn num_registers(&self) -> usize {
        self.registers.num_registers()
    }

    pub fn make_label(&mut self) -> Value {
        Value::Label(self.labels.make_label())
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Stores `src` into `target` as an object: primitives go through their wrapper's `valueOf`.
    pub fn build_box_if_primitive(&mut self, target: Value, ty: &TypeDescriptor, src: Value) -> Result<&mut Self, DexError> {
        if ty.is_primitive() {
            let box_type = ty.to_box_type()?;
            let value_of = self.dex.get_or_declare_method(
                &box_type,
                "valueOf",
                &Prototype::new(box_type.clone(), vec![ty.clone()]),
            );
            if ty.is_wide() {
                let pair = src.wide_pair()?;
                if is_short_register(src) && is_short_register(pair) {
                    self.add_instruction(Instruction::invoke_static_object(value_of, Some(target), &[src, pair]));
                } else {
                    self.add_instruction(Instruction::invoke_static_object_range(value_of, Some(target), src, 2));
                }
            } else if is_short_register(src) {
                self.add_instruction(Instruction::invoke_static_object(value_of, Some(target), &[src]));
            } else {
                self.add_instruction(Instruction::invoke_static_object_range(value_of, Some(target), src, 1));
            }
        } else if target != src {
            self.add_instruction(Instruction::op_with_args(Op::MoveObject, Some(target), &[src]));
        }
        Ok(self)
    }

    /// Stores `src` into `target` as a value of `ty`'s primitive: wrappers are unboxed through
    /// their accessor (`intValue`, ...).
    pub fn build_unbox_if_primitive(&mut self, target: Value, ty: &TypeDescriptor, src: Value) -> Result<&mut Self, DexError> {
        if ty.is_object() {
            let unbox_type = ty.to_unbox_type()?;
            let accessor = ty.value_method()?;
            let value = self.dex.get_or_declare_method(ty, accessor, &Prototype::returning(unbox_type.clone()));
            let invoke = if is_short_register(src) {
                Instruction::invoke_virtual(value, Some(target), src, &[])
            } else {
                Instruction::invoke_virtual_range(value, Some(target), src, 1)
            };
            self.add_instruction(if unbox_type.is_wide() { invoke.returning_wide() } else { invoke });
        } else if target != src {
            let op = if ty.is_wide() { Op::MoveWide } else { Op::Move };
            self.add_instruction(Instruction::op_with_args(op, Some(target), &[src]));
        }
        Ok(self)
    }

    fn ins_size(&self) -> usize {
        let this = if self.access_flags.contains(AccessFlags::STATIC) { 0 } else { 1 };
        self.prototype.param_slots() + this
    }

    fn register_value(&self, value: Value) -> Result<usize, DexError> {
        match value {
            Value::Local(r) => {
                if r >= self.num_registers() {
                    fail!(InvariantViolation, "v{} was never allocated, method has {} locals", r, self.num_registers());
                }
                Ok(r)
            }
            Value::Parameter(p) => {
                if p >= self.ins_size() {
                    fail!(InvariantViolation, "parameter p{} out of range, method takes {} slots", p, self.ins_size());
                }
                Ok(self.num_registers() + MAX_SCRATCH_REGISTERS + p)
            }
            other => Err(err!(InvariantViolation, "{} must be either a parameter or a register", other)),
        }
    }

    fn dest_register(&self, instruction: &Instruction) -> Result<usize, DexError> {
        match instruction.dest() {
            Some(dest) if dest.is_variable() => self.register_value(dest),
            Some(other) => Err(err!(InvariantViolation, "destination {} is not a register", other)),
            None => Err(err!(InvariantViolation, "missing destination")),
        }
    }

    fn method_description(&self) -> String {
        match self.dex.pools.method_key(self.decl) {
            Some(key) => format!("method {}->{}{}", key.class, key.name, key.prototype),
            None => format!("method {}", self.decl),
        }
    }

    /// Encodes the body and adds the method to its class, as a direct method when it is static,
    /// private or a constructor and as a virtual one otherwise.
    pub fn encode(mut self) -> Result<MethodId, DexError> {
        let instructions = std::mem::take(&mut self.instructions);
        let description = self.method_description();
        self.encode_body(&instructions)
            .map_err(|e| DexError::with_context(e, description.clone()))?;

        let ins = self.ins_size();
        let registers = self.num_registers() + MAX_SCRATCH_REGISTERS + ins;
        let return_count = if self.prototype.return_type().is_void() { 0 } else { 1 };
        let outs = return_count.max(self.max_args);
        if registers > u16::MAX as usize {
            fail!(InvariantViolation, "{} registers exceed the frame limit of {}", registers, description);
        }

        let code = CodeItem {
            registers_size: registers as u16,
            ins_size: ins as u16,
            outs_size: outs as u16,
            insns: std::mem::take(&mut self.buffer),
        };
        debug!(
            "encoded {}: {} registers, {} ins, {} outs, {} code units",
            description,
            registers,
            ins,
            outs,
            code.insns.len()
        );

        let class = &mut self.dex.classes[self.class.slot()];
        if class.methods().any(|m| m.decl == self.decl) {
            fail!(InvariantViolation, "{} is already defined", description);
        }
        let method = EncodedMethod {
            decl: self.decl,
            access_flags: self.access_flags,
            code: Some(code),
        };
        if self.access_flags.is_direct_method() {
            class.direct_methods.push(method);
        } else {
            class.virtual_methods.push(method);
        }
        Ok(self.decl)
    }

    fn encode_body(&mut self, instructions: &[Instruction]) -> Result<(), DexError> {
        for instruction in instructions {
            let start = self.buffer.len();
            self.encode_instruction(instruction)
                .map_err(|e| DexError::with_context(e, instruction.to_string()))?;
            trace!("{} => {:04x?}", instruction, &self.buffer[start..]);
        }
        if let Some(label) = self.labels.first_unbound_reference() {
            fail!(InvariantViolation, "label {} is referenced but never bound", label);
        }
        Ok(())
    }

    fn encode_instruction(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        match instruction.op() {
            Op::Return => self.encode_return(instruction, RETURN),
            Op::ReturnObject => self.encode_return(instruction, RETURN_OBJECT),
            Op::ReturnWide => self.encode_return(instruction, RETURN_WIDE),
            Op::Move | Op::MoveObject | Op::MoveWide => self.encode_move(instruction),
            Op::InvokeVirtual => self.encode_invoke(instruction, INVOKE_VIRTUAL),
            Op::InvokeDirect => self.encode_invoke(instruction, INVOKE_DIRECT),
            Op::InvokeStatic => self.encode_invoke(instruction, INVOKE_STATIC),
            Op::InvokeInterface => self.encode_invoke(instruction, INVOKE_INTERFACE),
            Op::InvokeVirtualRange => self.encode_invoke_range(instruction, INVOKE_VIRTUAL_RANGE),
            Op::InvokeDirectRange => self.encode_invoke_range(instruction, INVOKE_DIRECT_RANGE),
            Op::InvokeStaticRange => self.encode_invoke_range(instruction, INVOKE_STATIC_RANGE),
            Op::InvokeInterfaceRange => self.encode_invoke_range(instruction, INVOKE_INTERFACE_RANGE),
            Op::BindLabel => match instruction.args() {
                [Value::Label(label)] => self.labels.bind(*label, &mut self.buffer),
                _ => Err(err!(InvariantViolation, "bind expects a single label")),
            },
            Op::BranchEqz => self.encode_branch(instruction, IF_EQZ),
            Op::BranchNEqz => self.encode_branch(instruction, IF_NEZ),
            Op::New => self.encode_type_op(instruction, NEW_INSTANCE),
            Op::CheckCast => self.encode_type_op(instruction, CHECK_CAST),
            Op::NewArray => self.encode_new_array(instruction),
            Op::GetStaticField
            | Op::GetStaticObjectField
            | Op::SetStaticField
            | Op::SetStaticObjectField
            | Op::GetInstanceField
            | Op::GetInstanceObjectField
            | Op::SetInstanceField
            | Op::SetInstanceObjectField => self.encode_field_op(instruction),
            Op::AputObject => self.encode_aput(instruction),
        }
    }

    fn encode_return(&mut self, instruction: &Instruction, op: u8) -> Result<(), DexError> {
        if instruction.dest().is_some() {
            fail!(InvariantViolation, "return takes no destination");
        }
        match instruction.args() {
            [] => {
                encode_10x(&mut self.buffer, RETURN_VOID);
                Ok(())
            }
            [source] => {
                let source = self.register_value(*source)?;
                encode_11x(&mut self.buffer, op, source)
            }
            args => Err(err!(InvariantViolation, "return takes at most one value, got {}", args.len())),
        }
    }

    fn encode_move(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        let dest = self.dest_register(instruction)?;
        let source = match instruction.args() {
            [source] => *source,
            args => fail!(InvariantViolation, "move takes one source, got {}", args.len()),
        };

        match (instruction.op(), source) {
            (Op::Move, Value::Immediate(v)) | (Op::MoveObject, Value::Immediate(v @ 0)) => {
                if dest < 16 && (-8..8).contains(&v) {
                    encode_11n(&mut self.buffer, CONST_4, dest, v)
                } else if i16::try_from(v).is_ok() {
                    encode_21s(&mut self.buffer, CONST_16, dest, v)
                } else if i32::try_from(v).is_ok() {
                    encode_31i(&mut self.buffer, CONST, dest, v)
                } else {
                    Err(err!(Unsupported, "constant {} does not fit in 32 bits, use a wide move", v))
                }
            }
            (Op::MoveWide, Value::Immediate(v)) => {
                if i16::try_from(v).is_ok() {
                    encode_21s(&mut self.buffer, CONST_WIDE_16, dest, v)
                } else if i32::try_from(v).is_ok() {
                    encode_31i(&mut self.buffer, CONST_WIDE_32, dest, v)
                } else {
                    Err(err!(Unsupported, "wide constant {} is too large, only 32-bit literals are encoded", v))
                }
            }
            (_, Value::String(s)) => encode_21c(&mut self.buffer, CONST_STRING, dest, s.index()),
            (op, source) if source.is_variable() => {
                let source = self.register_value(source)?;
                let opcode = match op {
                    Op::Move => MOVE_16,
                    Op::MoveWide => MOVE_WIDE_16,
                    _ => MOVE_OBJECT_16,
                };
                encode_32x(&mut self.buffer, opcode, dest, source)
            }
            (op, source) => Err(err!(InvariantViolation, "cannot encode {:?} from {}", op, source)),
        }
    }

    fn encode_move_result(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        if instruction.dest().is_none() {
            return Ok(());
        }
        let dest = self.dest_register(instruction)?;
        let op = if instruction.result_is_object() {
            MOVE_RESULT_OBJECT
        } else if instruction.result_is_wide() {
            MOVE_RESULT_WIDE
        } else {
            MOVE_RESULT
        };
        encode_11x(&mut self.buffer, op, dest)
    }

    fn encode_invoke(&mut self, instruction: &Instruction, op: u8) -> Result<(), DexError> {
        let args = instruction.args();
        if args.len() > MAX_SHORT_INVOKE_ARGS {
            fail!(
                InvariantViolation,
                "{} arguments exceed the short invoke form, use invoke range",
                args.len()
            );
        }
        let mut registers = Vec::with_capacity(args.len());
        for arg in args {
            if !arg.is_variable() {
                fail!(InvariantViolation, "invoke argument {} is not a register", arg);
            }
            let register = self.register_value(*arg)?;
            if register >= 16 {
                fail!(InvariantViolation, "long args should use invoke range (v{})", register);
            }
            registers.push(register);
        }
        encode_35c(&mut self.buffer, op, instruction.index_argument(), &registers)?;
        self.encode_move_result(instruction)?;
        self.max_args = self.max_args.max(args.len());
        Ok(())
    }

    fn encode_invoke_range(&mut self, instruction: &Instruction, op: u8) -> Result<(), DexError> {
        let (first, count) = match instruction.args() {
            [first, Value::Immediate(count)] if *count >= 0 => (*first, *count as usize),
            _ => fail!(InvariantViolation, "range invoke expects a first register and a count"),
        };
        let first = self.register_value(first)?;
        let frame = self.num_registers() + MAX_SCRATCH_REGISTERS + self.ins_size();
        if first + count > frame {
            fail!(InvariantViolation, "range v{}..v{} runs past the {} register frame", first, first + count, frame);
        }
        encode_3rc(&mut self.buffer, op, instruction.index_argument(), count, first)?;
        self.encode_move_result(instruction)?;
        self.max_args = self.max_args.max(count);
        Ok(())
    }

    fn encode_branch(&mut self, instruction: &Instruction, op: u8) -> Result<(), DexError> {
        let (test, label) = match instruction.args() {
            [test, Value::Label(label)] if test.is_variable() => (*test, *label),
            _ => fail!(InvariantViolation, "branch expects a register and a label"),
        };
        let register = self.register_value(test)?;
        let instruction_offset = self.buffer.len();
        let field_offset = instruction_offset + 1;
        let offset = self.labels.value(label, instruction_offset, field_offset)?;
        encode_21t(&mut self.buffer, op, register, offset)
    }

    fn encode_type_op(&mut self, instruction: &Instruction, op: u8) -> Result<(), DexError> {
        let dest = self.dest_register(instruction)?;
        match instruction.args() {
            [Value::Type(ty)] => encode_21c(&mut self.buffer, op, dest, ty.index()),
            _ => Err(err!(InvariantViolation, "{} expects a single type", opcode_name(op))),
        }
    }

    fn encode_new_array(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        let dest = self.dest_register(instruction)?;
        match instruction.args() {
            [length, Value::Type(ty)] => {
                let length = self.register_value(*length)?;
                encode_22c(&mut self.buffer, NEW_ARRAY, dest, length, ty.index())
            }
            _ => Err(err!(InvariantViolation, "new-array expects a length register and a type")),
        }
    }

    fn encode_aput(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        let value = self.dest_register(instruction)?;
        match instruction.args() {
            [array, index] => {
                let array = self.register_value(*array)?;
                let index = self.register_value(*index)?;
                encode_23x(&mut self.buffer, APUT_OBJECT, value, array, index)
            }
            _ => Err(err!(InvariantViolation, "aput-object expects an array and an index")),
        }
    }

    fn encode_field_op(&mut self, instruction: &Instruction) -> Result<(), DexError> {
        let field = instruction.index_argument();
        match (instruction.op(), instruction.args()) {
            (op @ (Op::GetStaticField | Op::GetStaticObjectField), []) => {
                let dest = self.dest_register(instruction)?;
                let opcode = if op == Op::GetStaticField { SGET } else { SGET_OBJECT };
                encode_21c(&mut self.buffer, opcode, dest, field)
            }
            (op @ (Op::SetStaticField | Op::SetStaticObjectField), [value]) if instruction.dest().is_none() => {
                let value = self.register_value(*value)?;
                let opcode = if op == Op::SetStaticField { SPUT } else { SPUT_OBJECT };
                encode_21c(&mut self.buffer, opcode, value, field)
            }
            (op @ (Op::GetInstanceField | Op::GetInstanceObjectField), [object]) => {
                let dest = self.dest_register(instruction)?;
                let object = self.register_value(*object)?;
                let opcode = if op == Op::GetInstanceField { IGET } else { IGET_OBJECT };
                encode_22c(&mut self.buffer, opcode, dest, object, field)
            }
            (op @ (Op::SetInstanceField | Op::SetInstanceObjectField), [object, value]) if instruction.dest().is_none() => {
                let object = self.register_value(*object)?;
                let value = self.register_value(*value)?;
                let opcode = if op == Op::SetInstanceField { IPUT } else { IPUT_OBJECT };
                encode_22c(&mut self.buffer, opcode, value, object, field)
            }
            (op, args) => Err(err!(InvariantViolation, "malformed {:?} with {} arguments", op, args.len())),
        }
    }
}
