//! Embedded static HTML served by the web UI.
//!
//! Kept as `&'static str` so the binary needs no asset directory at runtime.

/// Placeholder in [`MAP_TEMPLATE`] replaced by the map configuration JSON.
pub const MAP_CONFIG_PLACEHOLDER: &str = "__GEOVIZ_MAP_CONFIG__";
/// Placeholder in [`MAP_TEMPLATE`] replaced by the page title.
pub const MAP_TITLE_PLACEHOLDER: &str = "__GEOVIZ_MAP_TITLE__";

/// Standalone Leaflet page. Everything it draws comes from the injected config.
pub const MAP_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>__GEOVIZ_MAP_TITLE__</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
  <link rel="stylesheet" href="https://unpkg.com/leaflet-control-geocoder@2.4.0/dist/Control.Geocoder.css" />
  <script src="https://unpkg.com/leaflet-control-geocoder@2.4.0/dist/Control.Geocoder.js"></script>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet.draw/1.0.4/leaflet.draw.css" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet.draw/1.0.4/leaflet.draw.js"></script>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/gh/ardhi/Leaflet.MousePosition/src/L.Control.MousePosition.min.css" />
  <script src="https://cdn.jsdelivr.net/gh/ardhi/Leaflet.MousePosition/src/L.Control.MousePosition.min.js"></script>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet.fullscreen@3.0.0/Control.FullScreen.css" />
  <script src="https://cdn.jsdelivr.net/npm/leaflet.fullscreen@3.0.0/Control.FullScreen.min.js"></script>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet.locatecontrol@0.79.0/dist/L.Control.Locate.min.css" />
  <script src="https://cdn.jsdelivr.net/npm/leaflet.locatecontrol@0.79.0/dist/L.Control.Locate.min.js"></script>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/gh/ljagis/leaflet-measure@2.1.7/dist/leaflet-measure.min.css" />
  <script src="https://cdn.jsdelivr.net/gh/ljagis/leaflet-measure@2.1.7/dist/leaflet-measure.min.js"></script>
  <script src="https://cdn.jsdelivr.net/gh/digidem/leaflet-side-by-side@2.0.0/leaflet-side-by-side.min.js"></script>
  <style>
    html, body, #map { height: 100%; margin: 0; }
    .leaflet-popup-content-wrapper {
      overflow: auto !important;
      max-width: 200px !important;
      max-height: 175px !important;
    }
    .geoviz-popup table { border-collapse: collapse; font-size: 12px; }
    .geoviz-popup th { text-align: left; padding-right: 8px; }
    .geoviz-legend {
      background: rgba(255, 255, 255, 0.9);
      padding: 6px 10px;
      border-radius: 4px;
      font: 12px/1.4 sans-serif;
      box-shadow: 0 1px 4px rgba(0, 0, 0, 0.3);
    }
    .geoviz-legend .caption { font-weight: bold; margin-bottom: 4px; }
    .geoviz-legend .swatch {
      display: inline-block; width: 14px; height: 14px;
      margin-right: 6px; vertical-align: middle; border: 1px solid #888;
    }
    .geoviz-legend .bar { width: 180px; height: 12px; border: 1px solid #888; }
    .geoviz-legend .ticks { display: flex; justify-content: space-between; width: 182px; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
    const config = __GEOVIZ_MAP_CONFIG__;

    const map = L.map('map').setView(config.center, config.zoom);

    // The first two tile sets are compared side by side (second on the left);
    // any further ones become switchable base layers.
    const tiles = config.tiles.map(tile => L.tileLayer(tile.url, { attribution: tile.attribution, maxZoom: 19 }));
    const baseLayers = {};
    if (tiles.length >= 2) {
      tiles[1].addTo(map);
      tiles[0].addTo(map);
      L.control.sideBySide(tiles[1], tiles[0]).addTo(map);
      config.tiles.slice(2).forEach((tile, i) => { baseLayers[tile.name] = tiles[i + 2]; });
    } else if (tiles.length === 1) {
      tiles[0].addTo(map);
    }

    L.Control.geocoder().addTo(map);

    const drawn = L.featureGroup().addTo(map);
    new L.Control.Draw({ edit: { featureGroup: drawn } }).addTo(map);
    map.on(L.Draw.Event.CREATED, event => drawn.addLayer(event.layer));

    L.control.mousePosition().addTo(map);
    L.control.fullscreen({
      position: 'topright',
      title: 'Expand me',
      titleCancel: 'Exit me',
      forceSeparateButton: true,
    }).addTo(map);
    L.control.locate().addTo(map);
    L.control.measure().addTo(map);

    function escapeHtml(value) {
      return String(value)
        .replace(/&/g, '&amp;')
        .replace(/</g, '&lt;')
        .replace(/>/g, '&gt;')
        .replace(/"/g, '&quot;');
    }

    function display(value) {
      if (value === null || value === undefined) return '';
      if (typeof value === 'object') return JSON.stringify(value);
      return value;
    }

    function popupHtml(properties) {
      const rows = Object.entries(properties || {})
        .map(([k, v]) => '<tr><th>' + escapeHtml(k) + '</th><td>' + escapeHtml(display(v)) + '</td></tr>')
        .join('');
      return '<div class="geoviz-popup"><table>' + rows + '</table></div>';
    }

    function legendHtml(legend) {
      let html = '<div class="caption">' + escapeHtml(legend.caption) + '</div>';
      if (legend.kind === 'colorbar') {
        html += '<div class="bar" style="background: linear-gradient(to right, ' + legend.colors.join(', ') + ')"></div>';
        html += '<div class="ticks"><span>' + escapeHtml(legend.min) + '</span><span>' + escapeHtml(legend.max) + '</span></div>';
      } else {
        legend.entries.forEach(entry => {
          html += '<div><span class="swatch" style="background:' + entry.color + '"></span>' + escapeHtml(entry.label) + '</div>';
        });
      }
      return html;
    }

    const overlays = { 'Geometries': drawn };
    config.layers.forEach(layer => {
      let overlay;
      if (layer.heat) {
        overlay = L.heatLayer(layer.heat, {
          radius: 25,
          blur: 15,
          gradient: { 0.4: 'blue', 0.65: 'lime', 1: 'red' },
        });
      } else {
        overlay = L.geoJSON(layer.geojson, {
          style: feature => feature.style,
          pointToLayer: (feature, latlng) => L.circleMarker(latlng, Object.assign({ radius: 6 }, feature.style)),
          onEachFeature: (feature, leafletLayer) => {
            leafletLayer.bindPopup(popupHtml(feature.properties));
            if (layer.tooltip) {
              const value = (feature.properties || {})[layer.tooltip];
              leafletLayer.bindTooltip(escapeHtml(layer.tooltip) + ': ' + escapeHtml(display(value)));
            }
          },
        });
      }
      overlay.addTo(map);
      overlays[layer.name] = overlay;

      if (layer.legend && layer.legend.kind !== 'none') {
        const control = L.control({ position: 'bottomright' });
        control.onAdd = () => {
          const div = L.DomUtil.create('div', 'geoviz-legend');
          div.innerHTML = legendHtml(layer.legend);
          return div;
        };
        control.addTo(map);
      }
    });

    L.control.layers(baseLayers, overlays).addTo(map);
    L.control.scale().addTo(map);

    if (config.fit) {
      map.fitBounds(config.fit, { maxZoom: 16 });
    }
  </script>
</body>
</html>
"#;

/// Upload and layer controls, with the current map in an iframe.
pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>GeoJSON Visualization</title>
  <style>
    body { margin: 0; font: 14px/1.4 sans-serif; display: flex; height: 100vh; }
    aside { width: 340px; padding: 12px 16px; overflow-y: auto; border-right: 1px solid #ddd; box-sizing: border-box; }
    main { flex: 1; display: flex; flex-direction: column; }
    iframe { flex: 1; border: 0; }
    h1 { font-size: 18px; }
    h2 { font-size: 15px; margin-top: 18px; border-top: 1px solid #eee; padding-top: 10px; }
    label { display: block; margin-top: 8px; font-weight: 600; }
    input, select, button { width: 100%; box-sizing: border-box; margin-top: 3px; padding: 4px; }
    button { cursor: pointer; }
    .row { display: flex; gap: 8px; }
    .row > div { flex: 1; }
    .error { color: #b00020; font-size: 12px; min-height: 1em; }
    .ok { color: #1b5e20; }
    .hidden { display: none; }
    #status { margin-top: 10px; }
    #summary { font-size: 12px; color: #444; }
    ul#layers { padding-left: 18px; }
  </style>
</head>
<body>
  <aside>
    <h1>GeoJSON Visualization</h1>

    <h2>Upload</h2>
    <input type="file" id="file" accept=".geojson" />
    <div class="error" id="upload-error"></div>

    <h2>Layer</h2>
    <label for="dataset">Dataset</label>
    <select id="dataset"></select>
    <div id="summary"></div>

    <label for="layer-name">Layer name</label>
    <input id="layer-name" />
    <div class="error" id="error-layer"></div>

    <label for="mode">Visualization type</label>
    <select id="mode">
      <option value="geometry">Geometries only</option>
      <option value="choropleth-classified">Numeric (classified)</option>
      <option value="choropleth-continuous">Numeric (continuous)</option>
      <option value="categorical">Categorical</option>
      <option value="heatmap">Heatmap</option>
    </select>

    <div id="column-block" class="hidden">
      <label for="column">Column to visualize</label>
      <select id="column"></select>
      <div class="error" id="error-column"></div>
    </div>

    <div id="classified-block" class="hidden">
      <div class="row">
        <div>
          <label for="scheme">Classification scheme</label>
          <select id="scheme"></select>
          <div class="error" id="error-scheme"></div>
        </div>
        <div>
          <label for="classes">Number of classes</label>
          <input id="classes" type="number" value="5" />
          <div class="error" id="error-classes"></div>
        </div>
      </div>
    </div>

    <div id="continuous-block" class="hidden">
      <div class="row">
        <div><label for="min">Min</label><input id="min" type="number" step="any" /></div>
        <div><label for="max">Max</label><input id="max" type="number" step="any" /></div>
      </div>
      <div class="error" id="error-bounds"></div>
    </div>

    <div id="categories-block" class="hidden">
      <label for="categories">Categories (none selected shows all)</label>
      <select id="categories" multiple size="6"></select>
    </div>

    <div id="style-block" class="hidden">
      <label for="colormap">Colormap</label>
      <input id="colormap" placeholder="e.g. YlOrRd, Blues, viridis, Set3" />
      <div class="error" id="error-colormap"></div>
      <label for="caption">Legend caption</label>
      <input id="caption" />
    </div>

    <button id="visualize" style="margin-top: 14px;">Visualize</button>
    <div id="status"></div>

    <h2>Layers</h2>
    <ul id="layers"></ul>

    <h2>Export</h2>
    <button id="export-html">Save map as HTML</button>
    <label for="export-layer">Layer image</label>
    <select id="export-layer"></select>
    <button id="export-png">Save layer as PNG</button>
    <div id="export-status"></div>
    <button id="clear" style="margin-top: 14px;">Clear all</button>
  </aside>
  <main>
    <iframe id="map" src="/map"></iframe>
  </main>

  <script>
    const $ = id => document.getElementById(id);
    const SCHEMES = ['BoxPlot', 'EqualInterval', 'FisherJenks', 'FisherJenksSampled', 'HeadTailBreaks',
      'JenksCaspall', 'JenksCaspallForced', 'JenksCaspallSampled', 'MaxP', 'MaximumBreaks',
      'NaturalBreaks', 'Quantiles', 'Percentiles', 'StdMean'];
    let datasets = [];
    let layerNames = [];

    SCHEMES.forEach(s => $('scheme').add(new Option(s, s, s === 'Quantiles', s === 'Quantiles')));

    async function api(path, options) {
      const response = await fetch(path, options);
      const body = await response.json();
      if (body.status === 'error') {
        const err = new Error(body.error.message);
        err.field = body.error.field;
        throw err;
      }
      return body.data;
    }

    function clearErrors() {
      document.querySelectorAll('.error').forEach(e => e.textContent = '');
      $('status').textContent = '';
    }

    function currentDataset() {
      return datasets.find(d => d.name === $('dataset').value);
    }

    function defaultLayerName() {
      const ds = $('dataset').value;
      if (!ds) return '';
      const base = 'Layer_' + ds;
      let name = base;
      for (let i = 1; layerNames.includes(name); i++) name = base + '_' + i;
      return name;
    }

    function refreshForm() {
      const mode = $('mode').value;
      const ds = currentDataset();
      const needsColumn = mode !== 'geometry' && mode !== 'heatmap';
      $('column-block').classList.toggle('hidden', !needsColumn);
      $('style-block').classList.toggle('hidden', !needsColumn);
      $('classified-block').classList.toggle('hidden', mode !== 'choropleth-classified');
      $('continuous-block').classList.toggle('hidden', mode !== 'choropleth-continuous');
      $('categories-block').classList.toggle('hidden', mode !== 'categorical');
      $('colormap').placeholder = mode === 'categorical' ? 'Set3' : 'YlOrRd';

      const columns = ds ? (mode === 'categorical'
        ? ds.categorical_columns.concat(ds.numeric_columns)
        : ds.numeric_columns) : [];
      const previous = $('column').value;
      $('column').innerHTML = '';
      columns.forEach(c => $('column').add(new Option(c, c, c === previous, c === previous)));
      refreshColumn();
    }

    async function refreshColumn() {
      const mode = $('mode').value;
      const ds = currentDataset();
      const column = $('column').value;
      if (!$('caption').dataset.touched) {
        $('caption').value = !column ? '' : mode === 'categorical' ? column + ' Categories'
          : mode === 'choropleth-classified' ? column + ' classification' : column;
      }
      $('categories').innerHTML = '';
      if (mode === 'categorical' && ds && column) {
        try {
          const values = await api('/api/datasets/' + encodeURIComponent(ds.name) + '/columns/' + encodeURIComponent(column) + '/values');
          values.forEach(v => $('categories').add(new Option(v, v)));
        } catch (e) { $('error-column').textContent = e.message; }
      }
      if (mode === 'choropleth-continuous' && ds && column) {
        const schema = ds.schema.columns.find(c => c.name === column);
        if (schema && schema.stats) {
          $('min').value = schema.stats.min;
          $('max').value = schema.stats.max;
        }
      }
    }

    function showSummary() {
      const ds = currentDataset();
      $('summary').textContent = ds
        ? ds.rows + ' features, ' + ds.columns + ' columns, geometry: ' + ds.geometry_types.join(', ')
          + (ds.point_count ? ', ' + ds.point_count + ' points' : '')
        : '';
    }

    async function loadDatasets() {
      datasets = await api('/api/datasets');
      const selected = $('dataset').value;
      $('dataset').innerHTML = '';
      datasets.forEach(d => $('dataset').add(new Option(d.name + ' (' + d.source + ')', d.name)));
      if (datasets.some(d => d.name === selected)) $('dataset').value = selected;
      showSummary();
      refreshForm();
    }

    async function loadLayers() {
      const layers = await api('/api/layers');
      layerNames = layers.map(l => l.name);
      $('layers').innerHTML = '';
      $('export-layer').innerHTML = '';
      layers.forEach(l => {
        const li = document.createElement('li');
        li.textContent = l.name + ' (' + l.dataset + ', ' + l.params.mode + ')';
        $('layers').appendChild(li);
        $('export-layer').add(new Option(l.name, l.name));
      });
      $('layer-name').value = defaultLayerName();
    }

    function reloadMap() {
      $('map').src = '/map?t=' + Date.now();
    }

    $('file').addEventListener('change', async () => {
      clearErrors();
      const file = $('file').files[0];
      if (!file) return;
      try {
        const body = await file.arrayBuffer();
        const summary = await api('/api/datasets?filename=' + encodeURIComponent(file.name), { method: 'POST', body });
        await loadDatasets();
        $('dataset').value = summary.name;
        showSummary();
        refreshForm();
        $('layer-name').value = defaultLayerName();
      } catch (e) {
        $('upload-error').textContent = e.message;
      }
    });

    $('dataset').addEventListener('change', () => { showSummary(); refreshForm(); $('layer-name').value = defaultLayerName(); });
    $('mode').addEventListener('change', () => { $('caption').dataset.touched = ''; refreshForm(); });
    $('column').addEventListener('change', () => { $('caption').dataset.touched = ''; refreshColumn(); });
    $('caption').addEventListener('input', () => { $('caption').dataset.touched = '1'; });

    $('visualize').addEventListener('click', async () => {
      clearErrors();
      const mode = $('mode').value;
      const number = id => $(id).value === '' ? null : Number($(id).value);
      const request = { mode };
      if (mode !== 'geometry' && mode !== 'heatmap') {
        request.column = $('column').value || null;
        request.colormap = $('colormap').value || null;
        request.legend_caption = $('caption').value || null;
      }
      if (mode === 'choropleth-classified') {
        request.scheme = $('scheme').value;
        request.classes = number('classes');
      }
      if (mode === 'choropleth-continuous') {
        request.min = number('min');
        request.max = number('max');
      }
      if (mode === 'categorical') {
        request.categories = Array.from($('categories').selectedOptions).map(o => o.value);
      }
      try {
        const layer = await api('/api/layers', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ dataset: $('dataset').value, layer_name: $('layer-name').value, request }),
        });
        $('status').innerHTML = '<span class="ok">Layer \'' + layer.name + '\' created successfully!</span>';
        await loadLayers();
        reloadMap();
      } catch (e) {
        const target = e.field && $('error-' + e.field);
        (target || $('status')).textContent = e.message;
        if (target) target.parentElement.classList.remove('hidden');
      }
    });

    $('export-html').addEventListener('click', async () => {
      try {
        const result = await api('/api/export/html', { method: 'POST' });
        $('export-status').textContent = 'Saved ' + result.path;
      } catch (e) { $('export-status').textContent = e.message; }
    });

    $('export-png').addEventListener('click', async () => {
      try {
        const result = await api('/api/export/png', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ layer: $('export-layer').value }),
        });
        $('export-status').textContent = 'Saved ' + result.path;
      } catch (e) { $('export-status').textContent = e.message; }
    });

    $('clear').addEventListener('click', async () => {
      await api('/api/clear', { method: 'POST' });
      await loadDatasets();
      await loadLayers();
      reloadMap();
    });

    loadDatasets().then(loadLayers).catch(e => { $('status').textContent = e.message; });
  </script>
</body>
</html>
"#;
