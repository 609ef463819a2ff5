#[cfg(test)]
mod tests {
    use crate::dex::dex_file::{read_string_data, ClassDataItem, ClassDefItem, CodeItem, Header, MethodIdItem, ProtoIdItem};
    use crate::dex::instructions::{Instruction, Op, Value};
    use crate::dex::writer::ImageOptions;
    use crate::dex::{read_u4, AccessFlags};
    use crate::types::{Prototype, TypeDescriptor};
    use crate::DexBuilder;
    use sha1::{Digest, Sha1};

    /// Minimal reader for the parts of an image the assertions look at.
    struct Image {
        bytes: Vec<u8>,
        header: Header,
    }

    impl Image {
        fn new(bytes: Vec<u8>) -> Image {
            let mut ix = 0;
            let header = Header::read(&bytes, &mut ix).unwrap();
            Image { bytes, header }
        }

        fn string(&self, index: u32) -> String {
            let mut ix = (self.header.string_ids_off + 4 * index) as usize;
            let mut data = read_u4(&self.bytes, &mut ix).unwrap() as usize;
            read_string_data(&self.bytes, &mut data).unwrap()
        }

        fn strings(&self) -> Vec<String> {
            (0..self.header.string_ids_size).map(|i| self.string(i)).collect()
        }

        fn type_name(&self, index: u32) -> String {
            let mut ix = (self.header.type_ids_off + 4 * index) as usize;
            self.string(read_u4(&self.bytes, &mut ix).unwrap())
        }

        fn proto(&self, index: u32) -> ProtoIdItem {
            let mut ix = (self.header.proto_ids_off + 12 * index) as usize;
            ProtoIdItem::read(&self.bytes, &mut ix).unwrap()
        }

        fn method(&self, index: u32) -> (String, String, String) {
            let mut ix = (self.header.method_ids_off + 8 * index) as usize;
            let item = MethodIdItem::read(&self.bytes, &mut ix).unwrap();
            let shorty = self.string(self.proto(item.proto_idx as u32).shorty_idx);
            (self.type_name(item.class_idx as u32), self.string(item.name_idx), shorty)
        }

        /// The class def fields up to `class_data_off`.
        fn class_def(&self, index: u32) -> (ClassDefItem, u32) {
            let mut ix = (self.header.class_defs_off + 32 * index) as usize;
            let mut words = [0u32; 8];
            for word in words.iter_mut() {
                *word = read_u4(&self.bytes, &mut ix).unwrap();
            }
            let item = ClassDefItem {
                class_idx: words[0],
                access_flags: words[1],
                superclass_idx: words[2],
                source_file_idx: words[4],
            };
            (item, words[6])
        }

        fn class_data(&self, offset: u32) -> ClassDataItem {
            let mut ix = offset as usize;
            ClassDataItem::read(&self.bytes, &mut ix).unwrap()
        }

        fn code(&self, offset: u32) -> CodeItem {
            let mut ix = offset as usize;
            CodeItem::read(&self.bytes, &mut ix).unwrap()
        }
    }

    fn foo_module() -> DexBuilder {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Foo");
        class.set_source_file("Foo.java");
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
        method.encode().unwrap();
        dex
    }

    #[test]
    fn header_checks() {
        let image = Image::new(foo_module().create_image(true).unwrap());
        let h = &image.header;
        assert_eq!(&image.bytes[..8], b"dex\n035\0");
        assert_eq!(h.file_size as usize, image.bytes.len());
        assert_eq!(h.checksum, adler::adler32_slice(&image.bytes[12..]));

        let mut hasher = Sha1::new();
        hasher.update(&image.bytes[32..]);
        assert_eq!(h.signature[..], hasher.finalize()[..]);
        assert_eq!(h.link_size, 0);
        assert_eq!(h.class_defs_size, 1);
    }

    #[test]
    fn string_ids_are_sorted() {
        let image = Image::new(foo_module().create_image(true).unwrap());
        let strings = image.strings();
        assert_eq!(
            strings,
            vec![
                "Foo.java",
                "I",
                "IL",
                "Ljava/lang/Object;",
                "Ljava/lang/String;",
                "Lpkg/Foo;",
                "bar",
                "length",
            ]
        );
    }

    #[test]
    fn class_and_code_are_linked() {
        let image = Image::new(foo_module().create_image(true).unwrap());

        assert_eq!(image.method(0), ("Ljava/lang/String;".to_string(), "length".to_string(), "I".to_string()));
        assert_eq!(image.method(1), ("Lpkg/Foo;".to_string(), "bar".to_string(), "IL".to_string()));

        let (class_def, class_data_off) = image.class_def(0);
        assert_eq!(image.type_name(class_def.class_idx), "Lpkg/Foo;");
        assert_eq!(image.type_name(class_def.superclass_idx), "Ljava/lang/Object;");
        assert_eq!(image.string(class_def.source_file_idx), "Foo.java");
        assert_eq!(class_def.access_flags, AccessFlags::PUBLIC.bits());

        let class_data = image.class_data(class_data_off);
        assert_eq!(class_data.direct_methods.len(), 1);
        let bar = &class_data.direct_methods[0];
        assert_eq!(bar.method_idx, 1);
        assert_eq!(bar.access_flags, (AccessFlags::PUBLIC | AccessFlags::STATIC).bits());
        assert_eq!(bar.code_off % 4, 0);

        let code = image.code(bar.code_off);
        assert_eq!((code.registers_size, code.ins_size, code.outs_size), (7, 1, 1));
        // length was declared after bar but sorts first
        assert_eq!(code.insns, vec![0x106e, 0x0000, 0x0006, 0x000a, 0x000f]);
    }

    #[test]
    fn shorty_and_parameters_of_protos() {
        let image = Image::new(foo_module().create_image(true).unwrap());
        assert_eq!(image.header.proto_ids_size, 2);
        let no_args = image.proto(0);
        assert_eq!(image.string(no_args.shorty_idx), "I");
        assert_eq!(no_args.parameters_off, 0);

        let one_arg = image.proto(1);
        assert_eq!(image.string(one_arg.shorty_idx), "IL");
        assert_eq!(image.type_name(one_arg.return_type_idx), "I");
        let mut ix = one_arg.parameters_off as usize;
        assert_eq!(read_u4(&image.bytes, &mut ix).unwrap(), 1);
    }

    #[test]
    fn identical_modules_produce_identical_images() {
        let options = ImageOptions::default();
        let a = foo_module().create_image_with(&options).unwrap();
        let b = foo_module().create_image_with(&options).unwrap();
        assert_eq!(a, b);
    }
}
