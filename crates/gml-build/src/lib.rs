//! Construction engine for **GML**: turns parsed declarations into live
//! objects of a host object system.
//!
//! The engine talks to the host only through [`ReflectionProvider`]. An
//! in-memory provider, [`ObjectSpace`](space::ObjectSpace), is included for
//! tools and tests.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`builder`] | `Builder`, two-pass construction, `build` / `compile` |
//! | [`coerce`] | `Dispatcher`, default converters, reference resolution |
//! | [`reflect`] | `ReflectionProvider`, `TypeHandle`, `Value`, `PropertySpec` |
//! | [`space`] | `ObjectSpace`, `TypeInfo` |
//! | [`module`] | `Module`, the unit `import` statements name |
//! | [`signals`] | `SignalHandlers` |
//! | [`objects`] | `Objects`, the registry a build returns |
//! | [`logging`] | `init_logging` for binaries |
//!
//! # Quick start
//!
//! ```rust
//! use gml_build::space::{ObjectSpace, TypeInfo};
//! use gml_build::{Builder, Value};
//!
//! let mut space = ObjectSpace::new()
//!     .with_type(TypeInfo::object("Label").property("text", "string"))
//!     .with_type(TypeInfo::object("Panel").container());
//!
//! let objects = Builder::new(&mut space)
//!     .compile(r#"Panel { id: root; Label { id: title; text: "Hi" } }"#)
//!     .unwrap();
//!
//! let title = objects.get("title").unwrap();
//! assert_eq!(space.property(title, "text"), Some(&Value::Str("Hi".into())));
//! ```

pub mod builder;
pub mod coerce;
pub mod error;
pub mod logging;
pub mod module;
pub mod objects;
pub mod reflect;
pub mod signals;
pub mod space;

pub use builder::{Builder, PACKING_BLOCK, build, compile};
pub use coerce::{Coerce, Coercion, Converter, Dispatcher, Operand, Pending, resolve_reference};
pub use error::{BuildError, CompileError};
pub use module::Module;
pub use objects::Objects;
pub use reflect::{
    Boxed, EnumValue, InstanceId, PropertySpec, ReflectError, ReflectionProvider, SignalHandler,
    TypeHandle, Value,
};
pub use signals::SignalHandlers;
