use strum_macros::{EnumIter, EnumString};

/// Vision capable models offered for captioning.
///
/// The client itself accepts any identifier, this list only drives defaults
/// and the choices shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, EnumString, strum_macros::Display)]
pub enum VisionModel {
    #[default]
    #[strum(serialize = "gpt-4o")]
    Gpt4o,
    #[strum(serialize = "gpt-4o-mini")]
    Gpt4oMini,
    #[strum(serialize = "gpt-4-turbo")]
    Gpt4Turbo,
}

impl VisionModel {
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4Turbo => "gpt-4-turbo",
        }
    }
}

#[test]
fn test_model_id_round_trip() {
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    for model in VisionModel::iter() {
        assert_eq!(model.to_string(), model.model_id());
        assert_eq!(VisionModel::from_str(model.model_id()), Ok(model));
    }
    assert!(VisionModel::from_str("dall-e-3").is_err());
}
