mod bind;
mod helpers;
mod rotation;
mod settings;
mod template;
mod today;

pub(crate) use bind::{cmd_bind_copy, cmd_bind_list, cmd_bind_remove, cmd_bind_set};
pub(crate) use rotation::{
    cmd_rotation_activate, cmd_rotation_create, cmd_rotation_delete, cmd_rotation_list,
    cmd_rotation_preset, cmd_rotation_presets, cmd_rotation_show,
};
pub(crate) use settings::{cmd_settings_mode, cmd_settings_pin, cmd_settings_set, cmd_settings_show};
pub(crate) use template::{cmd_template_add, cmd_template_delete, cmd_template_list};
pub(crate) use today::cmd_today;
