use std::any::Any;

/// A trait for objects that can provide data containers to be held by `Context`
///
/// Each module of the simulation keeps its state in a container owned by the
/// `Context`. The container is created with `init` the first time it is
/// requested mutably.
pub trait DataPlugin: Any {
    type DataContainer: 'static;

    fn init() -> Self::DataContainer;
}

/// Defines a new type for storing data in Context.
///
/// ```
/// use outbreak::{define_data_plugin, Context};
///
/// define_data_plugin!(Visits, Vec<u32>, Vec::new());
///
/// let mut context = Context::new();
/// context.get_data_mut(Visits).push(3);
/// assert_eq!(context.get_data(Visits), Some(&vec![3]));
/// ```
#[macro_export]
macro_rules! define_data_plugin {
    ($data_plugin:ident, $data_container:ty, $default:expr) => {
        #[derive(Copy, Clone)]
        struct $data_plugin;

        impl $crate::data_plugin::DataPlugin for $data_plugin {
            type DataContainer = $data_container;

            fn init() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;
