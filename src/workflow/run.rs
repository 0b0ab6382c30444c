//! Run and submit steps: drive the lifecycle against the installed toolchain.
use super::RunContext;
use crate::cli::{RunArgs, SubmitArgs};
use crate::lifecycle::{
    Collaborators, CollisionPolicy, CommandProvisioner, DataProvisioner, LifecycleController,
    NoProvisioner, RunOptions, RunState,
};
use crate::namelist::AnnualSpinupHistory;
use crate::settings::{provision_command, CasePaths};
use crate::submit;
use crate::toolchain::CimeToolchain;
use anyhow::{Context, Result};

/// Create, configure, and build the case, then submit unless told not to.
pub fn run_run(args: &RunArgs) -> Result<()> {
    let RunContext { request, scenario } = RunContext::load(&args.request)?;
    let policy = args.collision.map(CollisionPolicy::from).unwrap_or(request.collision);
    let provisioner: Box<dyn DataProvisioner> = match provision_command(&request.provision)? {
        Some(argv) => Box::new(CommandProvisioner::new(argv)),
        None => Box::new(NoProvisioner),
    };
    let toolchain = CimeToolchain::new(scenario.roots.model.clone());
    let options = RunOptions::from_request(&request);
    let case_dir = scenario.layout.case_dir.clone();

    let mut controller = LifecycleController::new(
        scenario,
        options,
        Collaborators {
            toolchain: &toolchain,
            provisioner: provisioner.as_ref(),
            history: &AnnualSpinupHistory,
        },
    );
    controller
        .run_to_build(policy)
        .with_context(|| format!("prepare case {}", case_dir.display()))?;

    if args.no_submit {
        let state_path = CasePaths::new(case_dir.clone()).run_state_path();
        controller.state().save(&state_path)?;
        println!("built {}", case_dir.display());
        println!("wrote {}", state_path.display());
        return Ok(());
    }
    let handle = controller
        .submit(args.depend.as_deref())
        .with_context(|| format!("submit case {}", case_dir.display()))?;
    print_submitted(&handle);
    Ok(())
}

/// Resubmit a built case from its saved state.
pub fn run_submit(args: &SubmitArgs) -> Result<()> {
    let state_path = CasePaths::new(args.case_dir.clone()).run_state_path();
    let mut state = RunState::load(&state_path)
        .with_context(|| format!("load run state {}", state_path.display()))?;
    let toolchain = CimeToolchain::new(state.scenario.roots.model.clone());
    let handle = submit::submit(&mut state, &toolchain, args.depend.as_deref())
        .with_context(|| format!("submit case {}", args.case_dir.display()))?;
    print_submitted(&handle);
    Ok(())
}

fn print_submitted(handle: &submit::JobHandle) {
    if handle.synthetic {
        println!("submitted {} (no scheduler)", handle.id);
    } else {
        println!("submitted {}", handle.id);
    }
}
