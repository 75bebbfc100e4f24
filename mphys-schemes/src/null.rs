use mphys_core::errors::MPhysResult;
use mphys_core::scheme::MicrophysicsScheme;
use mphys_core::thermo::ThermodynamicState;
use mphys_core::Timestep;

/// Scheme that returns the state it is given.
///
/// Useful for exercising the dynamics on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScheme;

impl MicrophysicsScheme for NullScheme {
    fn name(&self) -> &str {
        "NullScheme"
    }

    fn run(
        &mut self,
        _timestep: Timestep,
        state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        Ok(state)
    }
}
