use plotters::prelude::*;

use super::{PlotResult, Series};

/// x and y extent over all series, widened if degenerate
fn extent<'a, I>(series: I) -> ((f64, f64), (f64, f64))
where
    I: IntoIterator<Item = &'a Series>,
{
    let (mut x_min, mut x_max) = (f64::MAX, f64::MIN);
    let (mut y_min, mut y_max) = (f64::MAX, f64::MIN);
    for s in series {
        for (x, y) in s {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
    }
    if x_min >= x_max {
        x_max = x_min + 1.0;
    }
    if y_min >= y_max {
        y_min -= 0.5;
        y_max += 0.5;
    }
    let y_pad = (y_max - y_min) * 0.05;

    ((x_min, x_max), (y_min - y_pad, y_max + y_pad))
}

fn draw_lines(
    filename: &str,
    dims: (u32, u32),
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    reference: Option<(&str, &Series)>,
    lines: &[(&str, Series)],
) -> PlotResult {
    let all = reference.iter().map(|(_, s)| *s).chain(lines.iter().map(|(_, s)| s));
    let ((x_min, x_max), (y_min, y_max)) = extent(all);
    info!("y_min: {}, y_max: {}", y_min, y_max);

    let root_area = BitMapBackend::new(filename, dims).into_drawing_area();
    root_area.fill(&WHITE)?;
    let root_area = root_area.titled(filename, ("sans-serif", 20).into_font())?;

    let mut cc0 = ChartBuilder::on(&root_area)
        .margin(5)
        .set_all_label_area_size(50)
        .caption(caption, ("sans-serif", 30).into_font().with_color(&BLACK))
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    cc0.configure_mesh()
        .x_labels(20)
        .y_labels(20)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_formatter(&|v| format!("{:.2}", v))
        .y_label_formatter(&|v| format!("{:.3}", v))
        .draw()?;

    if let Some((name, series)) = reference {
        cc0.draw_series(LineSeries::new(series.clone(), BLACK.stroke_width(1)))?
            .label(name)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
    }
    for (i, (name, series)) in lines.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        cc0.draw_series(LineSeries::new(series.clone(), style))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    cc0.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root_area.present()?;

    info!("successfully plotted to {}", filename);

    Ok(())
}

/// Plot filter estimates against their lag in seconds
///
/// # Arguments:
/// filters: Named series of (lag, weight)
/// filename: The png file to write
/// dims: Pixel dimensions of the image
pub fn plot_filters(filters: &[(&str, Series)], filename: &str, dims: (u32, u32)) -> PlotResult {
    info!("plotting {} filters", filters.len());

    draw_lines(filename, dims, "filters", "time before spike (s)", "weight", None, filters)
}

/// Plot observed spike counts together with model predictions
///
/// # Arguments:
/// counts: Observed (time, count) pairs
/// predictions: Named series of (time, predicted count)
/// filename: The png file to write
/// dims: Pixel dimensions of the image
pub fn plot_predictions(
    counts: &Series,
    predictions: &[(&str, Series)],
    filename: &str,
    dims: (u32, u32),
) -> PlotResult {
    info!("n_counts: {}, n_predictions: {}", counts.len(), predictions.len());

    draw_lines(
        filename,
        dims,
        "spike count predictions",
        "time (s)",
        "spikes / bin",
        Some(("spike counts", counts)),
        predictions,
    )
}
