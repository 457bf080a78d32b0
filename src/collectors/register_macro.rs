macro_rules! register_collectors {
    (
        $(
            $module:ident => $collector_type:ident
        ),* $(,)?
    ) => {
        // Import all collector modules
        $(
            pub mod $module;
            pub use $module::$collector_type;
        )*

        // The closed set of backend collectors known to the exporter. Each
        // variant owns its backend client; construction happens in the
        // composition root, which is why there is no factory map here.
        pub enum CollectorKind {
            $(
                $collector_type($collector_type),
            )*
        }

        // Implement Collector for CollectorKind by dispatching to the variant
        impl Collector for CollectorKind {
            fn name(&self) -> &'static str {
                match self {
                    $(
                        CollectorKind::$collector_type(c) => c.name(),
                    )*
                }
            }

            fn describe(&self) -> Vec<&'static MetricDesc> {
                match self {
                    $(
                        CollectorKind::$collector_type(c) => c.describe(),
                    )*
                }
            }

            async fn collect(&self) -> Vec<MetricFamily> {
                match self {
                    $(
                        CollectorKind::$collector_type(c) => c.collect().await,
                    )*
                }
            }
        }

        $(
            impl From<$collector_type> for CollectorKind {
                fn from(collector: $collector_type) -> Self {
                    CollectorKind::$collector_type(collector)
                }
            }
        )*
    };
}
