#[derive(Debug, knuffel::Decode)]
pub struct Profile {
    #[knuffel(argument)]
    pub name: String,
    #[knuffel(property(name = "default"), default)]
    pub default: bool,

    #[knuffel(children)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, knuffel::Decode)]
pub enum Entry {
    Map(Map),
    Direction(DirectionMap),
    Continuous(Continuous),
    Steps(Steps),
}

#[derive(Debug, knuffel::Decode)]
pub struct Map {
    #[knuffel(argument)]
    pub button: String,
    #[knuffel(argument)]
    pub phase: String,
    #[knuffel(property(name = "state"), default)]
    pub state: Option<String>,
    #[knuffel(property(name = "action"))]
    pub action: String,
}

#[derive(Debug, knuffel::Decode)]
pub struct DirectionMap {
    #[knuffel(argument)]
    pub direction: String,
    #[knuffel(property(name = "action"))]
    pub action: String,
}

#[derive(Debug, knuffel::Decode)]
pub struct Continuous {
    #[knuffel(argument)]
    pub name: String,
    #[knuffel(property(name = "button"))]
    pub button: String,
    #[knuffel(property(name = "mode"))]
    pub mode: String,
    #[knuffel(property(name = "interval-ms"), default)]
    pub interval_ms: u64,

    #[knuffel(child)]
    pub filter: Option<FilterNode>,
    #[knuffel(child)]
    pub sensitivity: Option<SensitivityNode>,
}

#[derive(Debug, knuffel::Decode)]
pub struct Steps {
    #[knuffel(argument)]
    pub name: String,
    #[knuffel(property(name = "button"))]
    pub button: String,
    #[knuffel(property(name = "mode"))]
    pub mode: String,
    #[knuffel(property(name = "axis"))]
    pub axis: String,
    #[knuffel(property(name = "factor"))]
    pub factor: f32,
    #[knuffel(property(name = "interval-ms"), default)]
    pub interval_ms: u64,
    #[knuffel(property(name = "increment"))]
    pub increment: String,
    #[knuffel(property(name = "decrement"))]
    pub decrement: String,

    #[knuffel(child)]
    pub sensitivity: Option<SensitivityNode>,
}

/// Parameters not used by the named filter are ignored, missing ones take the filter's usual value
#[derive(Debug, knuffel::Decode)]
pub struct FilterNode {
    #[knuffel(argument)]
    pub kind: String,
    #[knuffel(property(name = "min-cutoff"), default)]
    pub min_cutoff: Option<f32>,
    #[knuffel(property(name = "beta"), default)]
    pub beta: Option<f32>,
    #[knuffel(property(name = "derivative-cutoff"), default)]
    pub derivative_cutoff: Option<f32>,
    #[knuffel(property(name = "process-noise"), default)]
    pub process_noise: Option<f32>,
    #[knuffel(property(name = "measurement-noise"), default)]
    pub measurement_noise: Option<f32>,
    #[knuffel(property(name = "alpha"), default)]
    pub alpha: Option<f32>,
    #[knuffel(property(name = "lookahead"), default)]
    pub lookahead: Option<f32>,
}

#[derive(Debug, knuffel::Decode)]
pub struct SensitivityNode {
    #[knuffel(property(name = "horizontal"), default)]
    pub horizontal: Option<f32>,
    #[knuffel(property(name = "vertical"), default)]
    pub vertical: Option<f32>,
    #[knuffel(property(name = "global"), default)]
    pub global: Option<f32>,
    #[knuffel(property(name = "invert-x"), default)]
    pub invert_x: bool,
    #[knuffel(property(name = "invert-y"), default)]
    pub invert_y: bool,
    #[knuffel(property(name = "invert-z"), default)]
    pub invert_z: bool,
}
