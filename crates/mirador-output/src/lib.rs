//! Mirador output generation.
//!
//! - **Mirador folder**: `data.csv`, `dictionary.csv`, `groups.xml`, `config.mira`
//! - **Flat CSV**: labels instead of codes, for general-purpose tools
//! - **SPSS**: a data copy plus a control card holding the metadata

mod common;
mod flat;
mod mirador;
mod spss;

pub use common::{
    MIRADOR_MISSING, ensure_output_dir, ensure_parent_dir, mirador_ranges, mirador_type,
};
pub use flat::{FlatCsvOptions, flat_frame, write_flat_csv};
pub use mirador::{
    DATA_FILE, DICTIONARY_FILE, GROUPS_FILE, MiradorFiles, MiradorOptions, PROJECT_FILE,
    write_data, write_dictionary, write_groups, write_mirador_folder, write_project,
};
pub use spss::{SpssFiles, spss_card, write_spss_outputs};
