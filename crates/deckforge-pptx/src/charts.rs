//! Chart part XML generation.
//!
//! Emits minimal `chartSpace` parts with literal category/value caches.
//! Bar, stacked bar, line, and pie cover every market data shape the
//! renderers produce.

use crate::constants::{NS_CHART, NS_DRAWING, NS_RELATIONSHIPS};
use crate::escape_xml;
use crate::spec::ChartSpec;
use deckforge_template::ChartKind;

/// Generate the XML for one chart part
pub fn chart_part_xml(chart: &ChartSpec) -> String {
    let plot = match chart.kind {
        ChartKind::Bar => bar_chart_xml(chart, "clustered"),
        ChartKind::StackedBar => bar_chart_xml(chart, "stacked"),
        ChartKind::Line => line_chart_xml(chart),
        ChartKind::Pie => pie_chart_xml(chart),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="{}" xmlns:a="{}" xmlns:r="{}">
  <c:chart>
    <c:title>
      <c:tx>
        <c:rich>
          <a:bodyPr/>
          <a:lstStyle/>
          <a:p><a:r><a:rPr lang="en-US" sz="1200" b="1"/><a:t>{}</a:t></a:r></a:p>
        </c:rich>
      </c:tx>
      <c:overlay val="0"/>
    </c:title>
    <c:autoTitleDeleted val="0"/>
    <c:plotArea>
      <c:layout/>
{}    </c:plotArea>
    <c:plotVisOnly val="1"/>
    <c:dispBlanksAs val="gap"/>
  </c:chart>
</c:chartSpace>"#,
        NS_CHART,
        NS_DRAWING,
        NS_RELATIONSHIPS,
        escape_xml(&chart.title),
        plot
    )
}

fn series_xml(chart: &ChartSpec, idx: usize) -> String {
    let series = &chart.series[idx];

    let mut cats = String::new();
    cats.push_str(&format!(
        "            <c:ptCount val=\"{}\"/>\n",
        chart.categories.len()
    ));
    for (i, cat) in chart.categories.iter().enumerate() {
        cats.push_str(&format!(
            "            <c:pt idx=\"{}\"><c:v>{}</c:v></c:pt>\n",
            i,
            escape_xml(cat)
        ));
    }

    let mut vals = String::new();
    vals.push_str(&format!(
        "            <c:ptCount val=\"{}\"/>\n",
        series.values.len()
    ));
    for (i, value) in series.values.iter().enumerate() {
        vals.push_str(&format!(
            "            <c:pt idx=\"{}\"><c:v>{}</c:v></c:pt>\n",
            i, value
        ));
    }

    format!(
        r#"        <c:ser>
          <c:idx val="{idx}"/>
          <c:order val="{idx}"/>
          <c:tx>
            <c:strLit>
              <c:ptCount val="1"/>
              <c:pt idx="0"><c:v>{name}</c:v></c:pt>
            </c:strLit>
          </c:tx>
          <c:cat>
            <c:strLit>
{cats}            </c:strLit>
          </c:cat>
          <c:val>
            <c:numLit>
{vals}            </c:numLit>
          </c:val>
        </c:ser>
"#,
        idx = idx,
        name = escape_xml(&series.name),
        cats = cats,
        vals = vals,
    )
}

fn all_series_xml(chart: &ChartSpec) -> String {
    (0..chart.series.len())
        .map(|i| series_xml(chart, i))
        .collect()
}

fn axes_xml() -> &'static str {
    r#"      <c:catAx>
        <c:axId val="111111111"/>
        <c:scaling><c:orientation val="minMax"/></c:scaling>
        <c:delete val="0"/>
        <c:axPos val="b"/>
        <c:crossAx val="222222222"/>
      </c:catAx>
      <c:valAx>
        <c:axId val="222222222"/>
        <c:scaling><c:orientation val="minMax"/></c:scaling>
        <c:delete val="0"/>
        <c:axPos val="l"/>
        <c:crossAx val="111111111"/>
      </c:valAx>
"#
}

fn bar_chart_xml(chart: &ChartSpec, grouping: &str) -> String {
    format!(
        r#"      <c:barChart>
        <c:barDir val="col"/>
        <c:grouping val="{}"/>
        <c:varyColors val="0"/>
{}        <c:axId val="111111111"/>
        <c:axId val="222222222"/>
      </c:barChart>
{}"#,
        grouping,
        all_series_xml(chart),
        axes_xml()
    )
}

fn line_chart_xml(chart: &ChartSpec) -> String {
    format!(
        r#"      <c:lineChart>
        <c:grouping val="standard"/>
        <c:varyColors val="0"/>
{}        <c:marker val="1"/>
        <c:axId val="111111111"/>
        <c:axId val="222222222"/>
      </c:lineChart>
{}"#,
        all_series_xml(chart),
        axes_xml()
    )
}

fn pie_chart_xml(chart: &ChartSpec) -> String {
    format!(
        r#"      <c:pieChart>
        <c:varyColors val="1"/>
{}        <c:firstSliceAng val="0"/>
      </c:pieChart>
"#,
        all_series_xml(chart)
    )
}
