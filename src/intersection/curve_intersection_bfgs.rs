use anyhow::Error;
use argmin::{
    argmin_error_closure,
    core::{
        ArgminFloat, CostFunction, Gradient, IterState, Problem, Solver, State, TerminationReason,
        TerminationStatus, KV,
    },
    float,
};
use nalgebra::{ComplexField, Matrix2, Vector2};

use crate::misc::FloatingPoint;

/// Customized quasi-Newton's method for finding the intersections between NURBS curves
/// Original source: https://argmin-rs.github.io/argmin/argmin/solver/quasinewton/struct.BFGS.html
#[derive(Clone)]
pub struct CurveIntersectionBFGS<F> {
    /// Tolerance for the stopping criterion based on the step size of the parameter
    step_size_tolerance: F,
    /// Tolerance for the stopping criterion based on the change of the cost
    cost_tolerance: F,
    /// Maximum number of iterations for the backtracking line search
    line_search_max_iters: u64,
}

impl<F> CurveIntersectionBFGS<F>
where
    F: FloatingPoint,
{
    pub fn new() -> Self {
        CurveIntersectionBFGS {
            step_size_tolerance: F::default_epsilon().sqrt(),
            cost_tolerance: F::default_epsilon(),
            line_search_max_iters: 32,
        }
    }

    pub fn with_step_size_tolerance(mut self, step_size_tolerance: F) -> Self {
        self.step_size_tolerance = step_size_tolerance;
        self
    }

    pub fn with_cost_tolerance(mut self, cost_tolerance: F) -> Self {
        self.cost_tolerance = cost_tolerance;
        self
    }

    pub fn with_line_search_max_iters(mut self, line_search_max_iters: u64) -> Self {
        self.line_search_max_iters = line_search_max_iters;
        self
    }
}

impl<F> Default for CurveIntersectionBFGS<F>
where
    F: FloatingPoint,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O, F> Solver<O, IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>>
    for CurveIntersectionBFGS<F>
where
    O: CostFunction<Param = Vector2<F>, Output = F>
        + Gradient<Param = Vector2<F>, Gradient = Vector2<F>>,
    F: FloatingPoint + ArgminFloat,
{
    const NAME: &'static str = "Curve intersection quasi-newton method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        mut state: IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>,
    ) -> Result<
        (
            IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>,
            Option<KV>,
        ),
        Error,
    > {
        let param = state.take_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`BFGS` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;

        let inv_hessian = state.take_inv_hessian().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`BFGS` requires an initial inverse Hessian. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;

        let cost = state.get_cost();
        let cost = if cost.is_infinite() {
            problem.cost(&param)?
        } else {
            cost
        };

        let grad = state
            .take_gradient()
            .map(Result::Ok)
            .unwrap_or_else(|| problem.gradient(&param))?;

        Ok((
            state
                .param(param)
                .cost(cost)
                .gradient(grad)
                .inv_hessian(inv_hessian),
            None,
        ))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        mut state: IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>,
    ) -> Result<
        (
            IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>,
            Option<KV>,
        ),
        Error,
    > {
        let param = state.take_param().ok_or_else(argmin_error_closure!(
            PotentialBug,
            "`BFGS`: Parameter vector in state not set."
        ))?;

        let cur_cost = state.get_cost();

        let prev_grad = state.take_gradient().ok_or_else(argmin_error_closure!(
            PotentialBug,
            "`BFGS`: Gradient in state not set."
        ))?;

        let inv_hessian = state.take_inv_hessian().ok_or_else(argmin_error_closure!(
            PotentialBug,
            "`BFGS`: Inverse Hessian in state not set."
        ))?;

        let p = -inv_hessian * prev_grad;

        // Backtracking line search along the search direction
        // with the Armijo sufficient decrease condition
        let c1 = float!(1e-4);
        let slope = prev_grad.dot(&p);
        let mut step = float!(1.0);
        let mut xk1 = param + p * step;
        let mut next_cost = problem.cost(&xk1)?;
        let mut iters = 0;
        while next_cost > cur_cost + c1 * step * slope && iters < self.line_search_max_iters {
            step *= float!(0.5);
            xk1 = param + p * step;
            next_cost = problem.cost(&xk1)?;
            iters += 1;
        }

        let grad = problem.gradient(&xk1)?;

        let yk = grad - prev_grad;
        let sk = xk1 - param;

        let yksk = yk.dot(&sk);

        // Skip the inverse hessian update if the curvature condition is not satisfied
        let inv_hessian = if ComplexField::abs(yksk) > F::epsilon() {
            let rhok = float!(1.0) / yksk;

            let e = Matrix2::identity();
            let mat1 = sk * yk.transpose() * rhok;
            let tmp1 = e - mat1;
            let tmp2 = e - mat1.transpose();

            let sksk = sk * sk.transpose() * rhok;

            tmp1 * inv_hessian * tmp2 + sksk
        } else {
            inv_hessian
        };

        Ok((
            state
                .param(xk1)
                .cost(next_cost)
                .gradient(grad)
                .inv_hessian(inv_hessian),
            None,
        ))
    }

    fn terminate(
        &mut self,
        state: &IterState<Vector2<F>, Vector2<F>, (), Matrix2<F>, (), F>,
    ) -> TerminationStatus {
        if let (Some(param), Some(prev_param)) = (state.get_param(), state.get_prev_param()) {
            if (param - prev_param).norm() < self.step_size_tolerance {
                return TerminationStatus::Terminated(TerminationReason::SolverConverged);
            }
        }
        if ComplexField::abs(state.get_prev_cost() - state.cost) < self.cost_tolerance {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }
        TerminationStatus::NotTerminated
    }
}
