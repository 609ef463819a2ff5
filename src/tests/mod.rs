mod image_scenarios;
mod method_scenarios;

#[cfg(test)]
mod tests {
    use crate::dex::ir::MethodId;
    use crate::types::{Prototype, TypeDescriptor};
    use crate::DexBuilder;

    #[test]
    fn class_names_to_descriptors() {
        let t = TypeDescriptor::from_classname("com.basic.Test");
        assert_eq!(t.descriptor(), "Lcom/basic/Test;");
        assert!(t.is_object());
        assert!(!t.is_wide());

        let a = TypeDescriptor::from_classname("[Ljava.lang.String;");
        assert_eq!(a.descriptor(), "[Ljava/lang/String;");
        assert!(a.is_array());
    }

    #[test]
    fn shorty_descriptors() {
        let p = Prototype::new(
            TypeDescriptor::VOID,
            vec![
                TypeDescriptor::from_descriptor("[I"),
                TypeDescriptor::LONG,
                TypeDescriptor::BOOLEAN,
                TypeDescriptor::STRING,
            ],
        );
        assert_eq!(p.shorty(), "VLJZL");
        assert_eq!(p.param_slots(), 5);
        assert_eq!(p.to_jni(), "([IJZLjava/lang/String;)V");
    }

    #[test]
    fn interning_identity() {
        let mut dex = DexBuilder::new();
        let s = dex.get_or_add_string("hello");
        assert_eq!(dex.get_or_add_string(String::from("hello")), s);
        assert_ne!(dex.get_or_add_string("world"), s);

        let t = dex.get_or_add_type(&TypeDescriptor::from_classname("pkg.Foo"));
        assert_eq!(dex.get_or_add_type(&TypeDescriptor::from_descriptor("Lpkg/Foo;")), t);

        let proto = Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]);
        let p = dex.get_or_encode_proto(&proto);
        assert_eq!(dex.get_or_encode_proto(&proto.clone()), p);

        let m = dex.get_or_declare_method(&TypeDescriptor::STRING, "length", &Prototype::returning(TypeDescriptor::INT));
        assert_eq!(
            dex.get_or_declare_method(&TypeDescriptor::STRING, "length", &Prototype::returning(TypeDescriptor::INT)),
            m
        );
        assert_eq!(dex.get_prototype_by_method_id(m), Some(Prototype::returning(TypeDescriptor::INT)));
        assert_eq!(dex.get_prototype_by_method_id(MethodId::from_index(99)), None);
    }

    #[test]
    fn field_key_ignores_type() {
        let mut dex = DexBuilder::new();
        let foo = TypeDescriptor::from_classname("pkg.Foo");
        let first = dex.get_or_add_field(&foo, "x", &TypeDescriptor::INT);
        let second = dex.get_or_add_field(&foo, "x", &TypeDescriptor::STRING);
        assert_eq!(first, second);
        let declared = dex.pools().field(first).field_type;
        assert_eq!(dex.pools().type_descriptor(declared), "I");
        assert_ne!(dex.get_or_add_field(&foo, "y", &TypeDescriptor::INT), first);
    }
}
