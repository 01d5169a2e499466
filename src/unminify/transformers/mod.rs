pub mod indirect_call;
pub mod jsx;
pub mod module_mapping;
pub mod runtime_helpers;
pub mod sequence_expressions;
pub mod smart_inline;
pub mod undefined;
pub mod use_strict;
pub mod while_loop;
