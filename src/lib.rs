//! # dexbuilder
//!
//! A library for assembling Android DEX modules in memory
//!
//! Classes, fields and methods are declared through a [`DexBuilder`], method bodies are written
//! as a flat stream of typed [`Instruction`](dex::instructions::Instruction)s and the finished
//! module is serialized with [`DexBuilder::create_image`].
//!
//! # Examples
//!
//! ```
//!  use dexbuilder::dex::instructions::{Instruction, Op, Value};
//!  use dexbuilder::types::{Prototype, TypeDescriptor};
//!  use dexbuilder::DexBuilder;
//!
//!  // class pkg.Foo { static int bar(String s) { return s.length(); } }
//!  let mut dex = DexBuilder::new();
//!  let mut class = dex.make_class("pkg.Foo");
//!  let mut method = class.create_method(
//!      "bar",
//!      Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]),
//!  );
//!  let length = method.dex().get_or_declare_method(
//!      &TypeDescriptor::STRING,
//!      "length",
//!      &Prototype::returning(TypeDescriptor::INT),
//!  );
//!  let result = method.alloc_register();
//!  method
//!      .add_instruction(Instruction::invoke_virtual(length, Some((&result).into()), Value::Parameter(0), &[]))
//!      .add_instruction(Instruction::return_value(Op::Return, (&result).into()));
//!  method.encode().unwrap();
//!
//!  let image = dex.create_image(true).unwrap();
//!  println!("{} bytes", image.len());
//! ```

#[macro_use]
pub mod dex;
mod tests;
pub mod types;

pub use dex::builder::{ClassBuilder, DexBuilder, FieldBuilder, MethodBuilder};
pub use dex::error::{DexError, DexErrorKind};
