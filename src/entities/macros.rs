//! Macros for reducing boilerplate when defining entities
//!
//! `impl_entity!` generates the record struct and its `Entity`
//! implementation, including the static `TableSchema` the store and the
//! backends work from.

/// Complete macro to create an entity with automatic trait implementations
///
/// The struct gets an `id: i64` (0 until created), the listed fields, and
/// one `Option<Target>` member per navigation. Navigation members are
/// skipped when empty and never reach storage.
///
/// # Example
///
/// ```rust,ignore
/// use villa::prelude::*;
///
/// impl_entity!(
///     Room,
///     "rooms",
///     {
///         number: i64,
///         house_id: i64,
///     },
///     unique [number],
///     navigations {
///         house: House => house_id,
///     }
/// );
///
/// let room = Room { number: 12, house_id: 1, ..Default::default() };
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $table:expr,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
        $(, unique [ $( $unique:ident ),* $(,)? ] )?
        $(, navigations {
            $( $nav:ident : $nav_type:ty => $foreign_key:ident ),* $(,)?
        } )?
        $(,)?
    ) => {
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Store-assigned identity, 0 until created
            #[serde(default)]
            pub id: i64,
            $(
                $(#[$field_meta])*
                pub $field : $field_type,
            )*
            $( $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $nav : Option<$nav_type>,
            )* )?
        }

        impl $crate::core::entity::Entity for $type {
            fn schema() -> &'static $crate::core::entity::TableSchema {
                static SCHEMA: $crate::core::entity::TableSchema =
                    $crate::core::entity::TableSchema {
                        table: $table,
                        fields: &["id", $( stringify!($field) ),*],
                        unique: &[ $( $( stringify!($unique) ),* )? ],
                        navigations: &[ $( $(
                            $crate::core::entity::Navigation {
                                name: stringify!($nav),
                                foreign_key: stringify!($foreign_key),
                                target: <$nav_type as $crate::core::entity::Entity>::schema,
                            }
                        ),* )? ],
                    };
                &SCHEMA
            }

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}
