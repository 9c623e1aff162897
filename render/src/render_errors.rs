use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("Character ramp must not be empty.")]
    EmptyRamp,
    #[error("Activation volume has no channels to reduce.")]
    EmptyVolume,
    #[error("Activation map is uniform, min-max normalization is undefined.")]
    DegenerateNormalization,
}
