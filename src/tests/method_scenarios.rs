#[cfg(test)]
mod tests {
    use crate::dex::dex_file::CodeItem;
    use crate::dex::instructions::{Instruction, Op, Value};
    use crate::dex::ir::ClassId;
    use crate::types::{Prototype, TypeDescriptor};
    use crate::DexBuilder;
    use rand::Rng;

    fn first_code(dex: &DexBuilder, class: ClassId) -> &CodeItem {
        dex.class_def(class)
            .methods()
            .next()
            .and_then(|m| m.code.as_ref())
            .unwrap()
    }

    #[test]
    fn string_length_method() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Foo");
        let mut method = class.create_method(
            "bar",
            Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]),
        );
        let length = method.dex().get_or_declare_method(
            &TypeDescriptor::STRING,
            "length",
            &Prototype::returning(TypeDescriptor::INT),
        );
        let result = method.alloc_register();
        method
            .add_instruction(Instruction::invoke_virtual(length, Some((&result).into()), Value::Parameter(0), &[]))
            .add_instruction(Instruction::return_value(Op::Return, (&result).into()));
        let bar = method.encode().unwrap();
        let class_id = class.id();

        assert_eq!(dex.classes().len(), 1);
        let decl = dex.pools().method(bar);
        let shorty = dex.pools().proto(decl.prototype).shorty;
        assert_eq!(dex.pools().string(shorty).value, "IL");
        assert_eq!(dex.pools().string(decl.name).value, "bar");

        let code = first_code(&dex, class_id);
        assert_eq!(code.registers_size, 7);
        assert_eq!(code.ins_size, 1);
        assert_eq!(code.outs_size, 1);
        // invoke-virtual {v6}, length; move-result v0; return v0
        assert_eq!(code.insns, vec![0x106e, length.index() as u16, 0x0006, 0x000a, 0x000f]);

        let image = dex.create_image(true).unwrap();
        assert_eq!(&image[..8], &[0x64, 0x65, 0x78, 0x0a, 0x30, 0x33, 0x35, 0x00]);
    }

    #[test]
    fn registers_are_reused_between_statements() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Reuse");
        let mut method = class.create_method("f", Prototype::returning(TypeDescriptor::VOID));
        {
            let a = method.alloc_register();
            let b = method.alloc_register();
            let c = method.alloc_register();
            assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));
        }
        let again = method.alloc_register();
        assert_eq!(again.index(), 0);
        assert_eq!(method.num_registers(), 3);
        method.add_instruction(Instruction::return_void());
        method.encode().unwrap();
        let class_id = class.id();
        assert_eq!(first_code(&dex, class_id).registers_size, 8);
    }

    #[test]
    fn box_then_unbox() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Boxes");
        let mut method = class.create_method("roundTrip", Prototype::returning(TypeDescriptor::INT));
        let value = method.alloc_register();
        let boxed = method.alloc_register();
        let (value, boxed): (Value, Value) = ((&value).into(), (&boxed).into());
        method
            .add_instruction(Instruction::op_with_args(Op::Move, Some(value), &[Value::Immediate(5)]))
            .build_box_if_primitive(boxed, &TypeDescriptor::INT, value)
            .unwrap()
            .build_unbox_if_primitive(value, &TypeDescriptor::OBJECT_INT, boxed)
            .unwrap()
            .add_instruction(Instruction::return_value(Op::Return, value));
        method.encode().unwrap();
        let class_id = class.id();

        let method_count = dex.pools().methods().len();
        let value_of = dex.get_or_declare_method(
            &TypeDescriptor::OBJECT_INT,
            "valueOf",
            &Prototype::new(TypeDescriptor::OBJECT_INT, vec![TypeDescriptor::INT]),
        );
        let int_value = dex.get_or_declare_method(
            &TypeDescriptor::OBJECT_INT,
            "intValue",
            &Prototype::returning(TypeDescriptor::INT),
        );
        assert_eq!(dex.pools().methods().len(), method_count);

        let code = first_code(&dex, class_id);
        assert_eq!(
            code.insns,
            vec![
                0x5012, // const/4 v0, 5
                0x1071, value_of.index() as u16, 0x0000, // invoke-static {v0}
                0x010c, // move-result-object v1
                0x106e, int_value.index() as u16, 0x0001, // invoke-virtual {v1}
                0x000a, // move-result v0
                0x000f,
            ]
        );
    }

    #[test]
    fn boxing_a_parameter_uses_the_range_form() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Boxes");
        let mut method = class.create_method(
            "wrap",
            Prototype::new(TypeDescriptor::OBJECT, vec![TypeDescriptor::INT]),
        );
        let boxed = method.alloc_register();
        let boxed: Value = (&boxed).into();
        method
            .build_box_if_primitive(boxed, &TypeDescriptor::INT, Value::Parameter(0))
            .unwrap()
            .add_instruction(Instruction::return_value(Op::ReturnObject, boxed));
        method.encode().unwrap();
        let class_id = class.id();

        let value_of = dex.get_or_declare_method(
            &TypeDescriptor::OBJECT_INT,
            "valueOf",
            &Prototype::new(TypeDescriptor::OBJECT_INT, vec![TypeDescriptor::INT]),
        );
        let code = first_code(&dex, class_id);
        // invoke-static/range {v6}; move-result-object v0; return-object v0
        assert_eq!(code.insns, vec![0x0177, value_of.index() as u16, 0x0006, 0x000c, 0x0011]);
    }

    #[test]
    fn five_arguments_need_a_range() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Calls");
        let ints = vec![TypeDescriptor::INT; 5];
        let target = class.dex().get_or_declare_method(
            &TypeDescriptor::from_classname("pkg.Sink"),
            "take",
            &Prototype::new(TypeDescriptor::VOID, ints),
        );
        let mut method = class.create_method("call", Prototype::returning(TypeDescriptor::VOID));
        let regs: Vec<_> = (0..5).map(|_| method.alloc_register()).collect();
        method
            .add_instruction(Instruction::invoke_static_range(target, None, (&regs[0]).into(), regs.len()))
            .add_instruction(Instruction::return_void());
        method.encode().unwrap();
        let class_id = class.id();

        let code = first_code(&dex, class_id);
        assert_eq!(code.insns, vec![0x0577, target.index() as u16, 0x0000, 0x000e]);
        assert_eq!(code.outs_size, 5);
    }

    #[test]
    fn null_check_with_forward_label() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Nulls");
        let mut method = class.create_method(
            "orNull",
            Prototype::new(TypeDescriptor::OBJECT, vec![TypeDescriptor::OBJECT]),
        );
        let text = method.dex().get_or_add_string("null");
        let nonnull = method.make_label();
        let tmp = method.alloc_register();
        let tmp: Value = (&tmp).into();
        method
            .add_instruction(Instruction::branch_nez(Value::Parameter(0), nonnull))
            .add_instruction(Instruction::op_with_args(Op::MoveObject, Some(tmp), &[Value::String(text)]))
            .add_instruction(Instruction::return_value(Op::ReturnObject, tmp))
            .add_instruction(Instruction::bind_label(nonnull))
            .add_instruction(Instruction::return_value(Op::ReturnObject, Value::Parameter(0)));
        method.encode().unwrap();
        let class_id = class.id();

        let code = first_code(&dex, class_id);
        assert_eq!(
            code.insns,
            vec![0x0639, 0x0005, 0x001a, text.index() as u16, 0x0011, 0x0611]
        );
    }

    #[test]
    fn random_constants_use_the_narrowest_form() {
        let mut rng = rand::rng();
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Random");
        let mut method = class.create_method("consts", Prototype::returning(TypeDescriptor::VOID));
        let r = method.alloc_register();
        let r: Value = (&r).into();

        let mut expected_units = 1;
        for _ in 0..500 {
            let v: i64 = match rng.random_range(0..3) {
                0 => rng.random_range(-8..8),
                1 => rng.random_range(i16::MIN as i64..=i16::MAX as i64),
                _ => rng.random_range(i32::MIN as i64..=i32::MAX as i64),
            };
            expected_units += if (-8..8).contains(&v) {
                1
            } else if i16::try_from(v).is_ok() {
                2
            } else {
                3
            };
            method.add_instruction(Instruction::op_with_args(Op::Move, Some(r), &[Value::Immediate(v)]));
        }
        method.add_instruction(Instruction::return_void());
        method.encode().unwrap();
        let class_id = class.id();
        assert_eq!(first_code(&dex, class_id).insns.len(), expected_units);
    }
}
