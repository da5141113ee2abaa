//! Message declaration macro.

/// Declares a message struct and its wire layout.
///
/// Each field may carry an annotation string after `=>`:
///
/// ```
/// use bnet_encoding::bnet_message;
///
/// bnet_message! {
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct CharList {
///         pub request_count: u16,
///         pub returned_count: u16 => "save-Returned",
///         pub names: Vec<u32> => "len-Returned",
///         pub online: bool => "size-uint8",
///     }
/// }
///
/// let list = CharList {
///     request_count: 8,
///     returned_count: 1,
///     names: vec![7],
///     online: true,
/// };
/// let bytes = bnet_encoding::marshal(&list).unwrap();
/// assert_eq!(&bytes[..], &[8, 0, 1, 0, 7, 0, 0, 0, 1]);
/// ```
///
/// The struct must implement `Default`. A field annotated `embed` whose type
/// is a message (or an `Option`/`Box` of one) has its fields promoted into
/// the enclosing message.
#[macro_export]
macro_rules! bnet_message {
    (@tag) => { "" };
    (@tag $tag:literal) => { $tag };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Wire for $name {
            const KIND: $crate::Kind = $crate::Kind::Struct(stringify!($name));

            fn encode(&self, enc: &mut $crate::Encoder) -> $crate::Result<()> {
                enc.encode_struct(self)
            }

            fn decode(&mut self, dec: &mut $crate::Decoder<'_>) -> $crate::Result<()> {
                dec.decode_struct(self)
            }

            fn embedded_type() -> ::std::option::Option<$crate::EmbeddedType> {
                ::std::option::Option::Some($crate::EmbeddedType::of::<Self>())
            }

            fn embedded(&self) -> $crate::Embedded<'_> {
                $crate::Embedded::Present(self)
            }

            fn embedded_mut(&mut self) -> ::std::option::Option<&mut dyn $crate::Record> {
                ::std::option::Option::Some(self)
            }
        }

        impl $crate::Record for $name {
            fn record_name(&self) -> &'static str {
                stringify!($name)
            }

            fn field_at(&self, index: usize) -> ::std::option::Option<&dyn $crate::Field> {
                let fields: &[&dyn $crate::Field] = &[$(&self.$field as &dyn $crate::Field),*];
                fields.get(index).copied()
            }

            fn field_at_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::Field> {
                const COUNT: usize = <[&str]>::len(&[$(stringify!($field)),*]);
                let fields: [&mut dyn $crate::Field; COUNT] =
                    [$(&mut self.$field as &mut dyn $crate::Field),*];
                fields.into_iter().nth(index)
            }
        }

        impl $crate::Message for $name {
            const NAME: &'static str = stringify!($name);

            fn declared_fields() -> ::std::vec::Vec<$crate::FieldDecl> {
                ::std::vec![
                    $(
                        $crate::FieldDecl::new::<$ty>(
                            stringify!($field),
                            $crate::bnet_message!(@tag $($tag)?),
                        )
                    ),*
                ]
            }
        }
    };
}
