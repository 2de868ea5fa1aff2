// Library root
// -----------
// The binary (`main.rs`) is a thin shell around these modules.
//
// Module responsibilities:
// - `cli`: command-line arguments (`--file PATH` and free prompt words).
// - `config`: environment snapshot, fixed model id and generation config.
// - `api`: blocking Gemini HTTP client and its wire types.
// - `relay`: picks the prompt, sends it and maps the outcome to an exit
//   status.
// - `error`: the error taxonomy shared by all of the above.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod relay;
