use glam::DVec2;

#[derive(Debug, Clone, Copy)]
pub struct SimplexOptions {
    /// Edge length of the initial simplex.
    pub step: f64,
    /// Stop once the simplex is smaller than this.
    pub x_tol: f64,
    /// Stop once the vertex values agree to within this.
    pub f_tol: f64,
    /// Stop as soon as the best value drops to this.
    pub target: f64,
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SimplexResult {
    pub point: DVec2,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder-Mead minimization in two dimensions with the standard coefficients.
pub fn minimize<F>(mut f: F, start: DVec2, options: SimplexOptions) -> SimplexResult
where
    F: FnMut(DVec2) -> f64,
{
    let mut simplex = [
        start,
        start + DVec2::new(options.step, 0.0),
        start + DVec2::new(0.0, options.step),
    ];
    let mut values = simplex.map(&mut f);

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        sort(&mut simplex, &mut values);

        let diameter = simplex[1].distance(simplex[0]).max(simplex[2].distance(simplex[0]));
        if values[0] <= options.target || diameter <= options.x_tol || (values[2] - values[0]).abs() <= options.f_tol {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = 0.5 * (simplex[0] + simplex[1]);
        let worst = simplex[2];

        let reflected = centroid + (centroid - worst);
        let f_reflected = f(reflected);

        if f_reflected < values[0] {
            let expanded = centroid + 2.0 * (centroid - worst);
            let f_expanded = f(expanded);
            if f_expanded < f_reflected {
                simplex[2] = expanded;
                values[2] = f_expanded;
            } else {
                simplex[2] = reflected;
                values[2] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[1] {
            simplex[2] = reflected;
            values[2] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[2] {
            let outside = centroid + 0.5 * (reflected - centroid);
            (outside, f(outside))
        } else {
            let inside = centroid + 0.5 * (worst - centroid);
            (inside, f(inside))
        };

        if f_contracted < values[2].min(f_reflected) {
            simplex[2] = contracted;
            values[2] = f_contracted;
            continue;
        }

        // shrink toward the best vertex
        for i in 1..3 {
            simplex[i] = simplex[0] + 0.5 * (simplex[i] - simplex[0]);
            values[i] = f(simplex[i]);
        }
    }

    sort(&mut simplex, &mut values);
    SimplexResult {
        point: simplex[0],
        value: values[0],
        iterations,
        converged,
    }
}

fn sort(simplex: &mut [DVec2; 3], values: &mut [f64; 3]) {
    let mut order = [0, 1, 2];
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.map(|i| simplex[i]);
    *values = order.map(|i| values[i]);
}
